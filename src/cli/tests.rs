use super::*;
use crate::config::MicroblogConfig;
use std::io;
use tracing::warn;

/// In-memory log sink.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn writer(&self) -> BoxMakeWriter {
        let sink = self.clone();
        BoxMakeWriter::new(move || sink.clone())
    }

    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn config_with_roster(dir: &tempfile::TempDir) -> Config {
    let roster = dir.path().join("users.json");
    std::fs::write(&roster, r#"{"+15125551212": "Dorothea"}"#).unwrap();
    Config {
        roster_file: roster.to_string_lossy().into_owned(),
        media_dir: dir.path().join("media").to_string_lossy().into_owned(),
        ..Config::default()
    }
}

#[test]
fn test_parse_subcommands() {
    let cli = Cli::try_parse_from(["txtpost", "serve"]).unwrap();
    assert!(matches!(cli.command, Commands::Serve));
    assert!(cli.config.is_none());

    let cli = Cli::try_parse_from(["txtpost", "lookup", "+15125551212", "--config", "/tmp/c.json"])
        .unwrap();
    assert!(matches!(cli.command, Commands::Lookup { ref token } if token == "+15125551212"));
    assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/c.json")));

    assert!(Cli::try_parse_from(["txtpost", "lookup"]).is_err());
    assert!(Cli::try_parse_from(["txtpost"]).is_err());
}

#[test]
fn test_lookup_known_and_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_roster(&dir);
    assert_eq!(lookup(&config, "+15125551212").unwrap(), "+15125551212: Dorothea");
    assert_eq!(
        lookup(&config, "+10000000000").unwrap(),
        "+10000000000: unknown sender"
    );
}

#[test]
fn test_lookup_missing_roster_fails() {
    let config = Config {
        roster_file: "/nonexistent/users.json".into(),
        ..Config::default()
    };
    assert!(lookup(&config, "+1").is_err());
}

#[test]
fn test_check_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with_roster(&dir);
    config.microblog = Some(MicroblogConfig {
        token: "t".into(),
        destination: "https://blog.example/".into(),
        ..MicroblogConfig::default()
    });

    let report = check(&config, &dir.path().join("config.json")).unwrap();
    assert!(report.contains("route:        POST /sms"));
    assert!(report.contains("(1 sender(s))"));
    assert!(report.contains("destinations: microblog\n"));
    assert!(report.contains("  microblog-token: set"));
    assert!(!report.contains("social-consumer-key"));
    assert!(report.contains("reporting:    logs only"));
}

#[test]
fn test_config_warnings_reach_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    let stderr = Captured::default();
    let (subscriber, _logging) = logging(stderr.writer(), EnvFilter::new("info"));

    let config = tracing::subscriber::with_default(subscriber, || {
        load_config(Some(missing.as_path())).unwrap()
    });

    assert!(config.logfile.is_empty());
    let out = stderr.contents();
    assert!(out.contains("WARN"), "{out}");
    assert!(out.contains(&format!("no config at {}", missing.display())), "{out}");
}

#[test]
fn test_redirect_to_logfile() {
    let dir = tempfile::tempdir().unwrap();
    let logfile = dir.path().join("txtpost.log");
    let stderr = Captured::default();
    let (subscriber, logging) = logging(stderr.writer(), EnvFilter::new("info"));
    let config = Config {
        logfile: logfile.to_string_lossy().into_owned(),
        ..Config::default()
    };

    tracing::subscriber::with_default(subscriber, || {
        warn!("before redirect");
        logging.redirect(&config).unwrap();
        warn!("after redirect");
    });

    let out = stderr.contents();
    assert!(out.contains("before redirect"));
    assert!(!out.contains("after redirect"));
    let file = std::fs::read_to_string(&logfile).unwrap();
    assert!(file.contains("after redirect"));
    assert!(!file.contains("before redirect"));
    // No terminal colour codes in the file.
    assert!(!file.contains('\u{1b}'));
}

#[test]
fn test_redirect_keeps_stderr_by_default() {
    let stderr = Captured::default();
    let (subscriber, logging) = logging(stderr.writer(), EnvFilter::new("info"));
    let config = Config {
        logfile: "stderr".into(),
        ..Config::default()
    };

    tracing::subscriber::with_default(subscriber, || {
        logging.redirect(&config).unwrap();
        warn!("still here");
    });
    assert!(stderr.contents().contains("still here"));
}

#[test]
fn test_redirect_unwritable_logfile_fails() {
    let (_subscriber, logging) = logging(Captured::default().writer(), EnvFilter::new("info"));
    let config = Config {
        logfile: "/nonexistent/dir/txtpost.log".into(),
        ..Config::default()
    };
    let err = logging.redirect(&config).unwrap_err();
    assert!(err.to_string().contains("Failed to open logfile"));
}
