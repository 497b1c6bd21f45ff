use mutfind::alignment::{DEFAULT_EXPECT_THRESHOLD, normalize_sequence};
use mutfind::blast_client::{BlastClient, BlastConfig};
use mutfind::disorder::{DisorderLookup, GeneCardsLookup, LookupConfig};
use mutfind::report::MutationFinder;
use serde::Deserialize;
use std::io::Read;
use std::time::Duration;
use std::{env, fs};

fn usage() {
    eprintln!(
        "Usage:\n  \
  mutfind_cli --version\n  \
  mutfind_cli [--config PATH] [--threshold E] [--no-lookup] SEQUENCE\n  \
  mutfind_cli [--config PATH] [--threshold E] [--no-lookup] @sequence.txt\n  \
  mutfind_cli [--config PATH] [--threshold E] [--no-lookup] -\n\n  \
  SEQUENCE is a raw DNA sequence; @file reads it from a file; - from stdin.\n  \
  --config PATH   JSON file overriding service endpoints and timeouts\n  \
  --threshold E   e-value cutoff for reported segments (default {DEFAULT_EXPECT_THRESHOLD})\n  \
  --no-lookup     skip the per-mutation disorder lookup"
    );
}

/// Optional JSON overrides for the two remote endpoints. Every field may be
/// omitted; anything absent keeps its built-in default.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    blast_base_url: Option<String>,
    program: Option<String>,
    database: Option<String>,
    word_size: Option<u32>,
    user_agent: Option<String>,
    timeout_secs: Option<u64>,
    poll_interval_secs: Option<u64>,
    poll_deadline_secs: Option<u64>,
    lookup_base_url: Option<String>,
    expect_threshold: Option<f64>,
}

impl FileConfig {
    fn from_json_file(path: &str) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Could not read config file '{path}': {e}"))?;
        serde_json::from_str(&text)
            .map_err(|e| format!("Could not parse config file '{path}': {e}"))
    }

    fn blast_config(&self) -> BlastConfig {
        let mut config = BlastConfig::default();
        if let Some(url) = &self.blast_base_url {
            config.base_url = url.clone();
        }
        if let Some(program) = &self.program {
            config.program = program.clone();
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(word_size) = self.word_size {
            config.word_size = word_size;
        }
        if let Some(agent) = &self.user_agent {
            config.user_agent = agent.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.poll_interval_secs {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.poll_deadline_secs {
            config.poll_deadline = Duration::from_secs(secs);
        }
        config
    }

    fn lookup_config(&self) -> LookupConfig {
        let mut config = LookupConfig::default();
        if let Some(url) = &self.lookup_base_url {
            config.base_url = url.clone();
        }
        if let Some(agent) = &self.user_agent {
            config.user_agent = agent.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

#[derive(Debug)]
struct CliOptions {
    config_path: Option<String>,
    threshold: Option<f64>,
    lookup_enabled: bool,
    input: String,
}

fn parse_args(args: &[String]) -> Result<CliOptions, String> {
    let mut config_path: Option<String> = None;
    let mut threshold: Option<f64> = None;
    let mut lookup_enabled = true;
    let mut input: Option<String> = None;
    let mut idx = 1;
    while idx < args.len() {
        match args[idx].as_str() {
            "--config" => {
                let value = args
                    .get(idx + 1)
                    .ok_or_else(|| "--config requires a path".to_string())?;
                config_path = Some(value.clone());
                idx += 2;
            }
            "--threshold" => {
                let value = args
                    .get(idx + 1)
                    .ok_or_else(|| "--threshold requires a value".to_string())?;
                threshold = Some(
                    value
                        .parse()
                        .map_err(|e| format!("Invalid --threshold value '{value}': {e}"))?,
                );
                idx += 2;
            }
            "--no-lookup" => {
                lookup_enabled = false;
                idx += 1;
            }
            other if other.starts_with("--") => {
                return Err(format!("Unknown option '{other}'"));
            }
            other => {
                if input.is_some() {
                    return Err("More than one sequence argument given".to_string());
                }
                input = Some(other.to_string());
                idx += 1;
            }
        }
    }
    let input = input.ok_or_else(|| "Missing sequence argument".to_string())?;
    Ok(CliOptions {
        config_path,
        threshold,
        lookup_enabled,
        input,
    })
}

fn load_sequence_arg(value: &str) -> Result<String, String> {
    if let Some(path) = value.strip_prefix('@') {
        return fs::read_to_string(path)
            .map_err(|e| format!("Could not read sequence file '{path}': {e}"));
    }
    if value == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Could not read sequence from stdin: {e}"))?;
        return Ok(buffer);
    }
    Ok(value.to_string())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        return Err("Missing sequence argument".to_string());
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let options = parse_args(&args)?;
    let file_config = match &options.config_path {
        Some(path) => FileConfig::from_json_file(path)?,
        None => FileConfig::default(),
    };
    let raw_sequence = load_sequence_arg(&options.input)?;

    // Reject blank input before going anywhere near the network.
    let sequence = normalize_sequence(&raw_sequence).map_err(|e| e.to_string())?;

    let service = BlastClient::new(file_config.blast_config())?;
    let lookup: Option<Box<dyn DisorderLookup>> = if options.lookup_enabled {
        Some(Box::new(GeneCardsLookup::new(file_config.lookup_config())?))
    } else {
        None
    };

    let threshold = options
        .threshold
        .or(file_config.expect_threshold)
        .unwrap_or(DEFAULT_EXPECT_THRESHOLD);
    let finder = MutationFinder::new(Box::new(service), lookup).with_threshold(threshold);
    println!("{}", finder.find_mutations(&sequence));
    Ok(())
}
