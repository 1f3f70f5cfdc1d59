use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commentary::DEFAULT_CONTEXT_WINDOW;
use crate::model::AuditSettings;
use crate::reference::DEFAULT_OPEN_RANGE_LIMIT;
use crate::title::TitleMatch;

#[derive(Parser, Debug)]
#[command(
    name = "verse-audit",
    version,
    about = "Cross-check a verse outline against a commentary transcript"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify outline leaves that own no verses.
    Leaves(AuditArgs),
    /// Compare line-level section assignments between outline and transcript.
    Lines(AuditArgs),
    /// Structural checks on the outline tree and its verse table.
    Integrity(AuditArgs),
    /// Run every audit from a single evaluation.
    All(AuditArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AuditArgs {
    #[arg(long, default_value = "texts/verse_hierarchy_map.json")]
    pub outline_path: PathBuf,

    #[arg(long, default_value = "texts/verse_commentary_mapping.txt")]
    pub transcript_path: PathBuf,

    #[arg(long, default_value = "reports")]
    pub out_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_CONTEXT_WINDOW)]
    pub context_window: usize,

    #[arg(long, default_value_t = DEFAULT_OPEN_RANGE_LIMIT)]
    pub open_range_limit: u32,

    #[arg(long, value_enum, default_value_t = TitleMatch::Lenient)]
    pub title_match: TitleMatch,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

impl AuditArgs {
    pub fn settings(&self) -> AuditSettings {
        AuditSettings {
            context_window: self.context_window,
            open_range_limit: self.open_range_limit,
            title_match: self.title_match,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_resolve_to_default_settings() {
        let cli = Cli::try_parse_from(["verse-audit", "lines"]).expect("args should parse");
        let Commands::Lines(args) = cli.command else {
            panic!("expected lines subcommand");
        };

        assert_eq!(args.out_dir, PathBuf::from("reports"));
        assert!(!args.dry_run);
        let settings = args.settings();
        assert_eq!(settings.context_window, 25);
        assert_eq!(settings.open_range_limit, 999);
        assert_eq!(settings.title_match, TitleMatch::Lenient);
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "verse-audit",
            "all",
            "--title-match",
            "strict",
            "--context-window",
            "10",
            "--open-range-limit",
            "120",
            "--dry-run",
        ])
        .expect("args should parse");
        let Commands::All(args) = cli.command else {
            panic!("expected all subcommand");
        };

        let settings = args.settings();
        assert_eq!(settings.title_match, TitleMatch::Strict);
        assert_eq!(settings.context_window, 10);
        assert_eq!(settings.open_range_limit, 120);
        assert!(args.dry_run);
    }
}
