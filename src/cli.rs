use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "linefinder",
    version,
    about = "Identify spectral lines interactively and record them in a log file"
)]
pub struct Cli {
    /// Input spectrum (ASCII: WAVELENGTH FLUX per line).
    #[arg(value_name = "SPECTRUM", default_value = "test.ascii")]
    pub spectrum: PathBuf,

    /// Line list (ASCII: REST_WAVELENGTH ION SHORT_ID F per line).
    #[arg(value_name = "LINELIST", default_value = "linelist.lst")]
    pub line_list: PathBuf,

    /// Output log file, also read at start-up if it exists.
    #[arg(value_name = "LOG", default_value = "linefinder.log")]
    pub log: PathBuf,

    /// Start with tutorial messages switched on.
    #[arg(long)]
    pub tutorial: bool,

    /// JSON file with session settings.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_conventional_file_names() {
        let cli = Cli::parse_from(["linefinder"]);
        assert_eq!(cli.spectrum, PathBuf::from("test.ascii"));
        assert_eq!(cli.line_list, PathBuf::from("linelist.lst"));
        assert_eq!(cli.log, PathBuf::from("linefinder.log"));
        assert!(!cli.tutorial);
    }

    #[test]
    fn positional_paths_and_flags() {
        let cli = Cli::parse_from(["linefinder", "q.txt", "lines.lst", "out.log", "--tutorial"]);
        assert_eq!(cli.spectrum, PathBuf::from("q.txt"));
        assert_eq!(cli.log, PathBuf::from("out.log"));
        assert!(cli.tutorial);
    }
}
