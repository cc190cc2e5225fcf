use clap::ValueEnum;

/// Target platform environment
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum Platform {
    /// Browser environment (served by `kiln dev`)
    #[value(name = "browser")]
    Browser,

    /// Node.js environment (supervised by `kiln run`)
    #[value(name = "node")]
    Node,

    /// No platform assumptions
    #[value(name = "neutral")]
    Neutral,
}
