use clap::Parser;

/// Behaviour is configured through the optional YAML config file, so the
/// command line only carries `--help` and `--version`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "kdrill",
    version,
    about = "Drill from namespaces to pods to containers to logs in your terminal."
)]
pub struct CliArgs {}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::{CommandFactory, Parser};

    #[test]
    fn parses_without_arguments() {
        assert!(CliArgs::try_parse_from(["kdrill"]).is_ok());
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(CliArgs::try_parse_from(["kdrill", "--namespace", "default"]).is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }
}
