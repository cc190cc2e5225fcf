#[cfg(test)]
mod tests {
    use crate::cli::validation::parse_host;
    use crate::cli::{Cli, Command, Platform};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_parse_host_valid() {
        assert_eq!(parse_host("127.0.0.1"), Ok("127.0.0.1".to_string()));
        assert_eq!(parse_host("::1"), Ok("::1".to_string()));
        assert_eq!(parse_host("localhost"), Ok("localhost".to_string()));
        assert_eq!(parse_host("dev-box.local"), Ok("dev-box.local".to_string()));
    }

    #[test]
    fn test_parse_host_invalid() {
        assert_eq!(parse_host("").unwrap_err(), "Host cannot be empty");
        assert!(parse_host("-host").is_err());
        assert!(parse_host("my host").is_err());
        assert!(parse_host("http://localhost").is_err());
    }

    #[test]
    fn test_platform_enum_values() {
        use clap::ValueEnum;

        let platforms: Vec<_> = Platform::value_variants()
            .iter()
            .map(|v| v.to_possible_value().unwrap().get_name().to_string())
            .collect();
        assert_eq!(platforms, vec!["browser", "node", "neutral"]);
    }

    #[test]
    fn test_build_command() {
        let cli = Cli::parse_from([
            "kiln",
            "build",
            "src/app.ts",
            "--out-dir",
            "build",
            "--minify",
            "--platform",
            "node",
            "--external",
            "react,react-dom",
            "--external",
            "lodash",
        ]);

        let Command::Build(args) = cli.command else {
            panic!("expected build command");
        };
        assert_eq!(args.entry.as_deref(), Some("src/app.ts"));
        assert_eq!(args.out_dir, Some(PathBuf::from("build")));
        assert!(args.minify);
        assert!(!args.sourcemap);
        assert_eq!(args.platform, Some(Platform::Node));
        assert_eq!(args.external, vec!["react", "react-dom", "lodash"]);
    }

    #[test]
    fn test_dev_command() {
        let cli = Cli::parse_from(["kiln", "dev", "--port", "0", "--no-reload", "--host", "0.0.0.0"]);

        let Command::Dev(args) = cli.command else {
            panic!("expected dev command");
        };
        assert_eq!(args.entry, None);
        assert_eq!(args.port, Some(0));
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert!(args.no_reload);
    }

    #[test]
    fn test_run_command_trailing_argv() {
        let cli = Cli::parse_from([
            "kiln",
            "run",
            "src/server.ts",
            "--",
            "node",
            "--enable-source-maps",
            "${outdir}/server.js",
        ]);

        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.entry.as_deref(), Some("src/server.ts"));
        assert_eq!(
            args.command,
            vec!["node", "--enable-source-maps", "${outdir}/server.js"]
        );
    }

    #[test]
    fn test_run_command_without_argv() {
        let cli = Cli::parse_from(["kiln", "run"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(args.command.is_empty());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["kiln", "dev", "-v", "--no-color", "--config", "other.json"]);
        assert!(cli.verbose);
        assert!(!cli.quiet);
        assert!(cli.no_color);
        assert_eq!(cli.config, Some(PathBuf::from("other.json")));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["kiln", "-v", "-q", "build"]).is_err());
    }

    #[test]
    fn test_invalid_platform_rejected() {
        assert!(Cli::try_parse_from(["kiln", "build", "--platform", "deno"]).is_err());
    }
}
