use crate::data::LaunchArg;
pub use clap::Parser;
use std::path::PathBuf;

/// arrangement-view - tracks, regions and musical rulers of a host document
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Document (json) to show. A demo song is shown when omitted
    file: Option<PathBuf>,
    /// Config directory holding settings.json (default: the platform config dir)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,
    /// log information level (1:trace 2:info 3:warn 4:error 5:none)
    #[arg(short, long, default_value_t = 3)]
    log_level: u8,
    /// Show all region sequences, ignoring a stored "selected only" preference
    #[arg(short, long)]
    show_all: bool,
}

impl From<Args> for LaunchArg {
    fn from(val: Args) -> Self {
        let arg = LaunchArg::default();
        LaunchArg {
            file: val.file.or(arg.file),
            config_dir: val.config_dir.or(arg.config_dir),
            log_level: val.log_level,
            show_all: val.show_all,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let arg: LaunchArg = Args::parse_from(["arrangement-view"]).into();
        assert_eq!(arg.file, None);
        assert_eq!(arg.log_level, 3);
        assert!(!arg.show_all);
        assert_eq!(arg.config_dir, LaunchArg::default().config_dir);

        let arg: LaunchArg =
            Args::parse_from(["arrangement-view", "song.json", "-c", "/tmp/cfg", "-l", "1", "-s"]).into();
        assert_eq!(arg.file, Some(PathBuf::from("song.json")));
        assert_eq!(arg.config_dir, Some(PathBuf::from("/tmp/cfg")));
        assert_eq!(arg.log_level_filter(), log::LevelFilter::Trace);
        assert!(arg.show_all);
    }
}
