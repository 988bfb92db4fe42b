use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use coursebin_core::{Msg, NodeId, ProfileKind, ReservedSlot, Timestamp};

#[derive(Debug, Parser)]
#[command(name = "coursebin", version, about = "Collect courses and generate schedules")]
pub struct Cli {
    /// Scheduler API root, overriding the config file.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Directory holding the local state and `coursebin.ron`.
    #[arg(long, global = true, default_value = ".")]
    pub state_dir: PathBuf,

    /// Explicit configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log more (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProfileArg {
    #[default]
    TaskData,
    Schedule,
}

impl From<ProfileArg> for ProfileKind {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::TaskData => ProfileKind::TaskData,
            ProfileArg::Schedule => ProfileKind::Schedule,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a course and merge it into the bin.
    Add { term: String, course: String },
    /// Refetch courses whose data is older than the section lifetime.
    Refresh,
    /// Remove a course and all its nodes.
    Remove { course: String },
    /// Show the bin.
    List,
    /// Toggle `exclude` on one node.
    Exclude { node: String },
    /// Toggle `exempt` on one node, or set it on a whole subtree.
    Exempt {
        node: String,
        #[arg(long)]
        recursive: Option<bool>,
    },
    /// Put a course into an alternative group.
    Group { course: String, group: u32 },
    /// Renumber groups to 1..=n keeping their order.
    CompactGroups,
    /// Give every course its own group in bin order.
    ResetGroups,
    IncludeAll,
    ExcludeAll,
    /// Set a scheduling preference, e.g. `early_time 09:00`.
    Prefs { key: String, value: String },
    /// Keep a block of time free, e.g. `lunch 11:30 13:00 0:45 60`.
    Reserve {
        key: String,
        begin: String,
        end: String,
        /// Minimum free length inside the block.
        length: String,
        weight: u32,
    },
    /// Drop reserved blocks by key.
    Unreserve {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Submit the bin and wait for the generated schedules.
    Submit {
        #[arg(long)]
        name: Option<String>,
    },
    /// Follow an existing job.
    Status { job_id: u64 },
    /// Re-fetch stale sections of a saved schedule.
    CheckSections { schedule_id: u64 },
    /// Replace the local bin and preferences with a saved profile.
    PullProfile {
        id: u64,
        #[arg(long, value_enum, default_value_t)]
        kind: ProfileArg,
    },
    /// Upload the local bin and preferences to a saved profile.
    PushProfile {
        id: u64,
        #[arg(long, value_enum, default_value_t)]
        kind: ProfileArg,
    },
}

impl Command {
    /// Messages that carry out the command. `List` and `CheckSections` need
    /// none.
    pub fn into_msgs(self, now: Timestamp, lifetime: chrono::Duration) -> Vec<Msg> {
        match self {
            Command::Add { term, course } => vec![Msg::AddCourseRequested { term, course }],
            Command::Refresh => vec![Msg::RefreshStaleCourses { now, lifetime }],
            Command::Remove { course } => vec![Msg::DeleteCourse(course)],
            Command::List | Command::CheckSections { .. } => Vec::new(),
            Command::Exclude { node } => vec![Msg::ToggleExclude(NodeId::new(node))],
            Command::Exempt {
                node,
                recursive: None,
            } => vec![Msg::ToggleExempt(NodeId::new(node))],
            Command::Exempt {
                node,
                recursive: Some(value),
            } => vec![Msg::SetExemptRecursive {
                node_id: NodeId::new(node),
                value,
            }],
            Command::Group { course, group } => vec![Msg::SetGroup {
                node_id: NodeId::new(course),
                group,
            }],
            Command::CompactGroups => vec![Msg::StartGroupFromOne],
            Command::ResetGroups => vec![Msg::ResetGroups],
            Command::IncludeAll => vec![Msg::SetIncludeAll(true)],
            Command::ExcludeAll => vec![Msg::SetIncludeAll(false)],
            Command::Prefs { key, value } => vec![Msg::PreferenceEdited { key, value }],
            Command::Reserve {
                key,
                begin,
                end,
                length,
                weight,
            } => vec![Msg::ReservedSlotAdded(ReservedSlot {
                key,
                begin,
                end,
                length,
                weight,
            })],
            Command::Unreserve { keys } => vec![Msg::ReservedSlotsRemoved(keys)],
            Command::Submit { name } => vec![Msg::SubmitClicked { name }],
            Command::Status { job_id } => vec![Msg::TrackJobRequested(job_id)],
            Command::PullProfile { id, kind } => vec![Msg::ProfileLoadRequested {
                kind: kind.into(),
                id,
            }],
            Command::PushProfile { id, kind } => vec![Msg::ProfileSaveRequested {
                kind: kind.into(),
                id,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn exempt_with_value_is_recursive() {
        let cli = Cli::parse_from(["coursebin", "exempt", "csci-201.0", "--recursive", "true"]);
        let msgs = cli
            .command
            .into_msgs(chrono::Utc::now(), coursebin_core::default_lifetime());
        assert_eq!(
            msgs,
            vec![Msg::SetExemptRecursive {
                node_id: NodeId::new("csci-201.0"),
                value: true
            }]
        );
    }

    #[test]
    fn reserve_builds_a_slot() {
        let cli = Cli::parse_from(["coursebin", "reserve", "lunch", "11:30", "13:00", "0:45", "60"]);
        let msgs = cli
            .command
            .into_msgs(chrono::Utc::now(), coursebin_core::default_lifetime());
        assert_eq!(
            msgs,
            vec![Msg::ReservedSlotAdded(ReservedSlot {
                key: "lunch".to_string(),
                begin: "11:30".to_string(),
                end: "13:00".to_string(),
                length: "0:45".to_string(),
                weight: 60,
            })]
        );
    }

    #[test]
    fn unreserve_takes_several_keys() {
        let cli = Cli::parse_from(["coursebin", "unreserve", "lunch", "gym"]);
        let msgs = cli
            .command
            .into_msgs(chrono::Utc::now(), coursebin_core::default_lifetime());
        assert_eq!(
            msgs,
            vec![Msg::ReservedSlotsRemoved(vec![
                "lunch".to_string(),
                "gym".to_string()
            ])]
        );
        assert!(Cli::try_parse_from(["coursebin", "unreserve"]).is_err());
    }

    #[test]
    fn profile_kind_defaults_to_task_data() {
        let cli = Cli::parse_from(["coursebin", "--state-dir", "/tmp/cb", "pull-profile", "4"]);
        assert_eq!(cli.state_dir, PathBuf::from("/tmp/cb"));
        let msgs = cli
            .command
            .into_msgs(chrono::Utc::now(), coursebin_core::default_lifetime());
        assert_eq!(
            msgs,
            vec![Msg::ProfileLoadRequested {
                kind: ProfileKind::TaskData,
                id: 4
            }]
        );
    }
}
