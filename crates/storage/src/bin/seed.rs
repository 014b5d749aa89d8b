use std::collections::BTreeSet;
use std::fmt;

use challenge_core::model::{Challenge, ChallengeId, ChallengeTier, ProgressDraft, UserId};
use challenge_core::progress::active_rule_indices;
use chrono::{Duration, Local, NaiveDate};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user_id: UserId,
    tier: ChallengeTier,
    start_date: NaiveDate,
    rules: Vec<String>,
    logged_days: u32,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUserId { raw: String },
    InvalidTier { raw: String },
    InvalidStart { raw: String },
    InvalidDays { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidTier { raw } => {
                write!(f, "invalid --tier value (soft|medium|hard): {raw}")
            }
            ArgsError::InvalidStart { raw } => {
                write!(f, "invalid --start value (expected YYYY-MM-DD): {raw}")
            }
            ArgsError::InvalidDays { raw } => write!(f, "invalid --days value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("CHALLENGE_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut user_id = std::env::var("CHALLENGE_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or_else(UserId::random);
        let mut tier = ChallengeTier::Hard;
        let mut start_date = Local::now().date_naive();
        let mut rules: Vec<String> = vec![
            "Workout for 45 minutes".into(),
            "Drink 3 liters of water".into(),
            "Read 10 pages".into(),
        ];
        let mut logged_days = 3_u32;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                }
                "--tier" => {
                    let value = require_value(&mut args, "--tier")?;
                    tier = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidTier { raw: value.clone() })?;
                }
                "--start" => {
                    let value = require_value(&mut args, "--start")?;
                    start_date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                        .map_err(|_| ArgsError::InvalidStart { raw: value.clone() })?;
                }
                "--rules" => {
                    let value = require_value(&mut args, "--rules")?;
                    rules = value.split(',').map(|r| r.trim().to_string()).collect();
                }
                "--days" => {
                    let value = require_value(&mut args, "--days")?;
                    logged_days = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidDays { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            tier,
            start_date,
            rules,
            logged_days,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --user <uuid>             Owning user id (default: random)");
    eprintln!("  --tier <soft|medium|hard> Challenge tier (default: hard)");
    eprintln!("  --start <YYYY-MM-DD>      Start date (default: today)");
    eprintln!("  --rules <a,b,c>           Comma-separated rule list");
    eprintln!("  --days <n>                Perfect days to backfill from the start (default: 3)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  CHALLENGE_DB_URL, CHALLENGE_USER_ID");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    let challenge = Challenge::new(
        ChallengeId::random(),
        args.user_id,
        args.tier,
        args.start_date,
        args.rules,
        true,
    );
    storage.challenges.upsert_challenge(&challenge).await?;

    let all_active: BTreeSet<usize> = active_rule_indices(&challenge).into_iter().collect();
    for offset in 0..args.logged_days {
        let date = args.start_date + Duration::days(i64::from(offset));
        let draft = ProgressDraft::new(&challenge, date, &all_active, "seeded");
        storage.progress.save_daily_progress(&draft, None).await?;
    }

    println!(
        "Seeded challenge {} ({} tier, {} rules) with {} perfect days into {}",
        challenge.id(),
        challenge.tier(),
        challenge.rules().len(),
        args.logged_days,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
