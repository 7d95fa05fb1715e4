use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use qbank_core::{LatexPass, QuestionType};

/// Render, segment and crop exam papers, and maintain question banks.
#[derive(Debug, Parser)]
#[command(name = "qbank", about, version)]
pub struct Cli {
    /// Settings file (default: ./qbank.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory that image paths in banks are relative to
    #[arg(long, global = true, value_name = "DIR")]
    pub public_dir: Option<PathBuf>,

    /// Copy a JSON file to <name>.bak before overwriting it
    #[arg(long, global = true)]
    pub backup: bool,

    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG wins
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report which pages of a PDF carry a text layer
    Probe {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Rasterize PDF pages to page_N.png
    Render {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output directory
        #[arg(long, value_name = "DIR")]
        out: PathBuf,

        /// Page range (e.g. '1,3-5' or '20-'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Pixels per PDF point (default: from config, else 2.0)
        #[arg(long)]
        scale: Option<f32>,
    },

    /// Split page images into per-question crops at whitespace gaps
    Segment {
        /// Directory of page images (page_1.png, page_2.png, ...)
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Output directory for q001.png, q002.png, ...
        #[arg(long, value_name = "DIR")]
        out: PathBuf,

        /// Also write a skeleton bank referencing the crops
        #[arg(long, value_name = "FILE")]
        bank: Option<PathBuf>,

        /// Title of the skeleton bank
        #[arg(long, default_value = "Untitled Exam")]
        title: String,

        /// Empty rows that end a block
        #[arg(long)]
        gap: Option<u32>,

        /// Minimum block height in pixels
        #[arg(long)]
        min_height: Option<u32>,

        /// Rows to skip at the top of each page
        #[arg(long)]
        skip_top: Option<u32>,

        /// Rows to skip at the bottom of each page
        #[arg(long)]
        skip_bottom: Option<u32>,
    },

    /// Run the crop jobs listed in a TOML manifest
    Crop {
        /// Crop manifest ([[zone]], [[strip]], [[clip]], [[stitch]])
        #[arg(long, value_name = "FILE")]
        manifest: PathBuf,

        /// Attach the crops to this bank (overrides the manifest's `bank`)
        #[arg(long, value_name = "FILE")]
        bank: Option<PathBuf>,

        /// Print the detected regions without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Stack images top to bottom into one PNG
    Stitch {
        /// Images to stack, in order
        #[arg(value_name = "IMAGE", num_args = 2.., required = true)]
        parts: Vec<PathBuf>,

        /// Output PNG
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Append draft questions to a subject and section
    Append {
        /// Question bank JSON
        #[arg(value_name = "BANK")]
        bank: PathBuf,

        /// JSON array of draft questions
        #[arg(value_name = "DRAFTS")]
        drafts: PathBuf,

        /// Subject to append to (created when absent)
        #[arg(long)]
        subject: String,

        /// Section to append to
        #[arg(long, value_enum, default_value_t = SectionArg::Mcq)]
        section: SectionArg,
    },

    /// Attach image references to questions by id
    #[command(name = "attach-images")]
    AttachImages {
        /// Question bank JSON
        #[arg(value_name = "BANK")]
        bank: PathBuf,

        /// Assignments file (.toml with [[image]] tables, or a JSON array)
        #[arg(value_name = "ASSIGNMENTS")]
        assignments: PathBuf,
    },

    /// Set or reset answer keys
    Answers {
        /// Question bank JSON
        #[arg(value_name = "BANK")]
        bank: PathBuf,

        /// Answers file (.toml with [[answer]] tables, or a JSON array)
        #[arg(long, value_name = "FILE", conflicts_with = "reset", required_unless_present = "reset")]
        from: Option<PathBuf>,

        /// Overwrite every answer (with --value, else clear them)
        #[arg(long)]
        reset: bool,

        /// Value for --reset
        #[arg(long, requires = "reset")]
        value: Option<String>,
    },

    /// Convert Unicode math to LaTeX and repair broken LaTeX
    Latex {
        /// Question bank JSON
        #[arg(value_name = "BANK")]
        bank: PathBuf,

        /// Which passes to run
        #[arg(long, value_enum, default_value_t = PassArg::All)]
        pass: PassArg,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Regroup every question into subjects and sections by position
    Distribute {
        /// Question bank JSON
        #[arg(value_name = "BANK")]
        bank: PathBuf,

        /// Subject names in paper order
        #[arg(long, value_delimiter = ',', default_value = "Physics,Chemistry,Mathematics")]
        subjects: Vec<String>,

        /// Questions per subject (the last subject takes any overflow)
        #[arg(long, default_value_t = 25)]
        per_subject: usize,

        /// Multiple-choice questions at the start of each subject
        #[arg(long, default_value_t = 20)]
        mcq: usize,
    },

    /// Check a bank for structural problems
    Validate {
        /// Question bank JSON
        #[arg(value_name = "BANK")]
        bank: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Check that every referenced image exists and is not empty
    Images {
        /// Question bank JSON
        #[arg(value_name = "BANK")]
        bank: PathBuf,

        /// Remove references to missing or empty images
        #[arg(long)]
        prune: bool,
    },

    /// Write the flat standalone-simulator export
    Export {
        /// Question bank JSON
        #[arg(value_name = "BANK")]
        bank: PathBuf,

        /// Output JSON
        #[arg(long, value_name = "FILE")]
        out: PathBuf,

        /// Inline diagram images as data: URLs
        #[arg(long)]
        embed: bool,

        /// Copy referenced images into this directory, keeping their paths
        #[arg(long, value_name = "DIR", conflicts_with = "embed")]
        copy_images: Option<PathBuf>,
    },
}

/// Output format for report subcommands.
#[derive(Debug, Clone, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

/// Section of a subject.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SectionArg {
    /// Multiple choice
    Mcq,
    /// Numerical answer
    Numerical,
}

impl SectionArg {
    pub fn to_question_type(self) -> QuestionType {
        match self {
            SectionArg::Mcq => QuestionType::Mcq,
            SectionArg::Numerical => QuestionType::Numerical,
        }
    }
}

/// LaTeX passes for the `latex` subcommand.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PassArg {
    /// Unicode symbols to LaTeX
    Convert,
    /// Fix malformed LaTeX left by earlier tools
    Repair,
    /// Convert, then repair
    All,
}

impl PassArg {
    pub fn to_pass(self) -> LatexPass {
        match self {
            PassArg::Convert => LatexPass::Convert,
            PassArg::Repair => LatexPass::Repair,
            PassArg::All => LatexPass::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_probe_subcommand() {
        let cli = Cli::parse_from(["qbank", "probe", "exam.pdf"]);
        match cli.command {
            Commands::Probe { ref file, ref format } => {
                assert_eq!(file, &PathBuf::from("exam.pdf"));
                assert!(matches!(format, ReportFormat::Text));
            }
            _ => panic!("expected Probe subcommand"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "qbank",
            "validate",
            "bank.json",
            "-vv",
            "--public-dir",
            "site/public",
            "--backup",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.backup);
        assert_eq!(cli.public_dir, Some(PathBuf::from("site/public")));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["qbank", "-q", "-v", "validate", "bank.json"]).is_err());
    }

    #[test]
    fn parse_render_with_pages_and_scale() {
        let cli = Cli::parse_from([
            "qbank", "render", "exam.pdf", "--out", "pages", "--pages", "1,3-5", "--scale", "3",
        ]);
        match cli.command {
            Commands::Render {
                ref out,
                ref pages,
                scale,
                ..
            } => {
                assert_eq!(out, &PathBuf::from("pages"));
                assert_eq!(pages.as_deref(), Some("1,3-5"));
                assert_eq!(scale, Some(3.0));
            }
            _ => panic!("expected Render subcommand"),
        }
    }

    #[test]
    fn parse_append_section() {
        let cli = Cli::parse_from([
            "qbank",
            "append",
            "bank.json",
            "drafts.json",
            "--subject",
            "Chemistry",
            "--section",
            "numerical",
        ]);
        match cli.command {
            Commands::Append {
                ref subject,
                section,
                ..
            } => {
                assert_eq!(subject, "Chemistry");
                assert_eq!(section.to_question_type(), QuestionType::Numerical);
            }
            _ => panic!("expected Append subcommand"),
        }
    }

    #[test]
    fn distribute_defaults() {
        let cli = Cli::parse_from(["qbank", "distribute", "bank.json"]);
        match cli.command {
            Commands::Distribute {
                ref subjects,
                per_subject,
                mcq,
                ..
            } => {
                assert_eq!(subjects, &["Physics", "Chemistry", "Mathematics"]);
                assert_eq!(per_subject, 25);
                assert_eq!(mcq, 20);
            }
            _ => panic!("expected Distribute subcommand"),
        }
    }

    #[test]
    fn distribute_subject_list() {
        let cli = Cli::parse_from(["qbank", "distribute", "bank.json", "--subjects", "Maths,Physics"]);
        match cli.command {
            Commands::Distribute { ref subjects, .. } => {
                assert_eq!(subjects, &["Maths", "Physics"]);
            }
            _ => panic!("expected Distribute subcommand"),
        }
    }

    #[test]
    fn answers_needs_from_or_reset() {
        assert!(Cli::try_parse_from(["qbank", "answers", "bank.json"]).is_err());
        assert!(Cli::try_parse_from(["qbank", "answers", "bank.json", "--reset"]).is_ok());
        assert!(
            Cli::try_parse_from(["qbank", "answers", "bank.json", "--value", "1"]).is_err(),
            "--value requires --reset"
        );
    }

    #[test]
    fn stitch_needs_two_parts() {
        assert!(Cli::try_parse_from(["qbank", "stitch", "a.png", "--out", "o.png"]).is_err());
        let cli = Cli::parse_from(["qbank", "stitch", "a.png", "b.png", "--out", "o.png"]);
        match cli.command {
            Commands::Stitch { ref parts, .. } => assert_eq!(parts.len(), 2),
            _ => panic!("expected Stitch subcommand"),
        }
    }

    #[test]
    fn latex_pass_default_is_all() {
        let cli = Cli::parse_from(["qbank", "latex", "bank.json"]);
        match cli.command {
            Commands::Latex { pass, dry_run, .. } => {
                assert_eq!(pass.to_pass(), LatexPass::All);
                assert!(!dry_run);
            }
            _ => panic!("expected Latex subcommand"),
        }
    }

    #[test]
    fn export_embed_conflicts_with_copy() {
        assert!(
            Cli::try_parse_from([
                "qbank", "export", "bank.json", "--out", "sim.json", "--embed", "--copy-images", "dist",
            ])
            .is_err()
        );
    }
}
