use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use tau_messaging::{DEFAULT_DEEP_LINK_SCHEME, DEFAULT_EXPERIMENT_FEATURE_ID};

#[derive(Debug, Parser)]
#[command(
    name = "tau-messaging",
    about = "Validate Tau in-app messaging catalogs and replay message selection",
    version
)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["validate", "next", "press", "dismiss"])
))]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "TAU_MESSAGING_CATALOG",
        help = "Path to the messaging catalog JSON file"
    )]
    pub(crate) catalog: PathBuf,

    #[arg(
        long,
        env = "TAU_MESSAGING_CONTEXT",
        help = "Path to a JSON object of attributes that trigger expressions are evaluated against"
    )]
    pub(crate) context: Option<PathBuf>,

    #[arg(
        long = "metadata-state",
        env = "TAU_MESSAGING_METADATA_STATE",
        help = "JSON file persisting per-message impressions, presses and dismissals between runs"
    )]
    pub(crate) metadata_state: Option<PathBuf>,

    #[arg(
        long = "deep-link-scheme",
        env = "TAU_MESSAGING_DEEP_LINK_SCHEME",
        default_value = DEFAULT_DEEP_LINK_SCHEME,
        help = "Scheme prefixed to message actions of the form ://path"
    )]
    pub(crate) deep_link_scheme: String,

    #[arg(
        long = "experiment-feature-id",
        env = "TAU_MESSAGING_EXPERIMENT_FEATURE_ID",
        default_value = DEFAULT_EXPERIMENT_FEATURE_ID,
        help = "Feature id attached to experiment exposure events"
    )]
    pub(crate) experiment_feature_id: String,

    #[arg(
        long = "session-id",
        env = "TAU_MESSAGING_SESSION_ID",
        help = "App session id; repeated displays within one session count as one impression"
    )]
    pub(crate) session_id: Option<String>,

    #[arg(
        long,
        default_value = "home",
        help = "Surface to select for with --next, or to find the message on with --press/--dismiss"
    )]
    pub(crate) surface: String,

    #[arg(long, help = "Validate every catalog definition and report malformed messages")]
    pub(crate) validate: bool,

    #[arg(long, help = "Select the next message for --surface")]
    pub(crate) next: bool,

    #[arg(
        long = "record-display",
        requires = "next",
        help = "Record an impression for the message selected by --next"
    )]
    pub(crate) record_display: bool,

    #[arg(long, value_name = "MESSAGE_ID", help = "Press a message and print its dispatched action")]
    pub(crate) press: Option<String>,

    #[arg(long, value_name = "MESSAGE_ID", help = "Dismiss a message")]
    pub(crate) dismiss: Option<String>,

    #[arg(long, help = "Emit JSON instead of text reports")]
    pub(crate) json: bool,
}
