use amfile::config::{Config, DEFAULT_CONFIG_FILE};
use amfile::crypto::KEY_LEN;
use amfile::icf::{EntryType, Icf, IcfEntry};
use amfile::sync::{reconcile, BookkeepingPolicy, CreditPolicy, SyncPolicy};
use amfile::sysfile::{
    self, get_record, update_both, update_record, AnyRecord, BackupRecord, RecordKind, RecordStatus, Slot, SysData,
};
use amfile::types::{Timestamp, Version};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "amfile", about = "Inspect and edit arcade ICF and sysfile.dat files")]
struct Cli {
    /// Disable log output to the console
    #[arg(short, long, global = true)]
    silent: bool,
    /// Write log output to the configured log file instead of the console
    #[arg(long, global = true)]
    log_file: bool,
    /// JSON configuration file (defaults apply when it does not exist)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the header and entries of an encrypted .icf file
    IcfView {
        file: PathBuf,
        /// ICF key in hex (falls back to the configured key file)
        #[arg(short, long)]
        key: Option<String>,
        /// ICF IV in hex (falls back to the configured IV file)
        #[arg(short, long)]
        iv: Option<String>,
    },
    /// Create an encrypted .icf file with one System and one App entry
    IcfWrite {
        /// Four uppercase letters, e.g. SDEZ
        app_id: String,
        /// Platform id plus generation digit, e.g. AAV1
        platform_id: String,
        /// Version as MAJOR.MINOR.BUILD
        version: Version,
        /// `YYYY-MM-DD[ HH:MM:SS]`, default now
        timestamp: Option<String>,
        #[arg(short, long, default_value = "ICF1")]
        file_name: PathBuf,
        #[arg(short, long)]
        key: Option<String>,
        #[arg(short, long)]
        iv: Option<String>,
    },
    /// Show the contents of a sysfile.dat
    SysfileView {
        file: PathBuf,
        /// Dump a single record kind (credit, backup, emoney, ...)
        #[arg(short, long)]
        record: Option<String>,
        /// 0 = primary copy, 1 = mirror copy
        #[arg(long, default_value = "0")]
        slot: usize,
    },
    /// Edit player credits in a sysfile.dat
    SysfileSet {
        file: PathBuf,
        action: SetAction,
        value: u32,
        #[arg(long, default_value = "0")]
        player: usize,
        /// Coin chute credited by insert-coins
        #[arg(long, default_value = "0")]
        chute: usize,
        /// Also rewrite the mirror copy
        #[arg(long)]
        both_slots: bool,
    },
    /// Synchronize credits and bookkeeping between two sysfile.dat files
    SysfileSync {
        file1: PathBuf,
        /// Copied from FILE1 when it does not exist
        file2: PathBuf,
        /// no-change, file1, file2, higher, lower
        #[arg(default_value = "higher")]
        credits: CreditPolicy,
        /// As for credits, plus combine, diff-to-file1, diff-to-file2
        #[arg(default_value = "higher")]
        bookkeeping: BookkeepingPolicy,
        /// Common ancestor for the differential policies
        #[arg(short, long)]
        reference: Option<PathBuf>,
        #[arg(long)]
        both_slots: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SetAction {
    SetCredits,
    InsertCoins,
    RemoveCoins,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let cfg = Config::load_or_default(&cli.config)?;
    init_logging(&cli, &cfg)?;

    match cli.command {

        // ── ICF ──────────────────────────────────────────────────────────────
        Commands::IcfView { file, key, iv } => {
            let key = load_key(key.as_deref(), &cfg.icf_key_file, "key")?;
            let iv  = load_key(iv.as_deref(), &cfg.icf_iv_file, "IV")?;
            let icf = Icf::parse_encrypted(&std::fs::read(&file)?, &key, &iv)?;

            println!("── ICF ──────────────────────────────────────────────────");
            println!("  Path        {}", file.display());
            println!("  App ID      {}", icf.header.app_id);
            println!("  Platform    {}{}", icf.header.platform_id, icf.header.platform_generation);
            println!("  Size        {} B", icf.header.total_size);
            println!("  Entries     {}", icf.len());
            for (i, e) in icf.entries().iter().enumerate() {
                println!("  [{i}] {:<8} enabled={:<5} version {} (requires {}) {}",
                         e.entry_type.to_string(), e.is_enabled(),
                         e.version, e.required_version, e.timestamp);
                if e.entry_type == EntryType::Patch {
                    println!("       patch {} (requires {}) {}",
                             e.patch_version, e.patch_required_version, e.patch_timestamp);
                }
            }
        }

        Commands::IcfWrite { app_id, platform_id, version, timestamp, file_name, key, iv } => {
            let key = load_key(key.as_deref(), &cfg.icf_key_file, "key")?;
            let iv  = load_key(iv.as_deref(), &cfg.icf_iv_file, "IV")?;
            let time = match timestamp {
                Some(s) => parse_timestamp(&s)?,
                None    => Timestamp::now(),
            };

            let mut icf = Icf::new();
            icf.set_app_id(&app_id)?;
            icf.set_platform(&platform_id)?;
            icf.add_entry(IcfEntry::enabled(EntryType::System, version, time));
            icf.add_entry(IcfEntry::enabled(EntryType::App, version, time));

            std::fs::write(&file_name, icf.save_encrypted(&key, &iv)?)?;
            tracing::info!(path = %file_name.display(), %version, "ICF written");
        }

        // ── Sysfile ──────────────────────────────────────────────────────────
        Commands::SysfileView { file, record, slot } => {
            let data = std::fs::read(&file)?;
            let slot = Slot::try_from(slot)?;

            if let Some(name) = record {
                let kind = RecordKind::from_name(&name)?;
                let loaded = AnyRecord::load(&data, kind, slot)?;
                println!("{kind} (slot {slot}, {:?})", loaded.status);
                println!("{:#?}", loaded.record);
                return Ok(());
            }

            println!("── Record slots ─────────────────────────────────────────");
            for report in sysfile::inspect(&data)? {
                let state = match &report.status {
                    Ok(RecordStatus::Initialized)   => "ok".to_string(),
                    Ok(RecordStatus::Uninitialized) => "uninitialized".to_string(),
                    Err(e)                          => format!("INVALID: {e}"),
                };
                println!("  0x{:04X} {:<13} slot {}  {}", report.offset, report.kind.name(), report.slot, state);
            }

            let sys = SysData::parse_slot(&data, slot)?;
            let bk = &sys.backup.bookkeeping;
            println!("── Credits (slot {slot}) ──────────────────────────────────");
            println!("  Operation      {:?}", sys.credit.operation());
            println!("  Chute share    {:?}", sys.credit.chute_share_type());
            println!("  Service share  {:?}", sys.credit.service_share_type());
            println!("  Coin rate      {:?}", sys.credit.coin_rate);
            for (i, p) in sys.backup.players.iter().enumerate().filter(|(_, p)| p.credit != 0 || p.remain != 0) {
                println!("  Player {i}       credit {} remain {}", p.credit, p.remain);
            }
            println!("── Bookkeeping ──────────────────────────────────────────");
            println!("  Coin chutes    {:?}", bk.coin_chute);
            println!("  Total coin     {}", bk.total_coin);
            println!("  Coin credit    {}", bk.coin_credit);
            println!("  Service credit {}", bk.service_credit);
            println!("  E-money        coin {} credit {}", bk.emoney_coin, bk.emoney_credit);
            println!("  Total credit   {}", bk.total_credit);
            println!("  Region         {}", sys.localize.region);
        }

        Commands::SysfileSet { file, action, value, player, chute, both_slots } => {
            let data = std::fs::read(&file)?;
            let mut backup = get_record::<BackupRecord>(&data, Slot::Primary)?.record;

            match action {
                SetAction::SetCredits => {
                    let slot = backup.players.get_mut(player).ok_or_else(|| format!("no player slot {player}"))?;
                    slot.credit = u8::try_from(value).map_err(|_| format!("credit {value} exceeds 255"))?;
                }
                SetAction::InsertCoins => backup.insert_coins(value, chute, player)?,
                SetAction::RemoveCoins => backup.remove_coins(value, player)?,
            }
            tracing::info!(?action, value, player, "sysfile updated");

            std::fs::write(&file, write_backup(&data, &backup, both_slots)?)?;
            tracing::info!(path = %file.display(), "file saved");
        }

        Commands::SysfileSync { file1, file2, credits, bookkeeping, reference, both_slots } => {
            if !file2.exists() {
                tracing::warn!(from = %file1.display(), to = %file2.display(), "second file missing, copying first");
                std::fs::copy(&file1, &file2)?;
            }
            let data1 = std::fs::read(&file1)?;
            let data2 = std::fs::read(&file2)?;
            let mut backup1 = get_record::<BackupRecord>(&data1, Slot::Primary)?.record;
            let mut backup2 = get_record::<BackupRecord>(&data2, Slot::Primary)?.record;
            let base = match &reference {
                Some(path) => Some(get_record::<BackupRecord>(&std::fs::read(path)?, Slot::Primary)?.record),
                None       => None,
            };

            let policy = SyncPolicy { credit: credits, bookkeeping };
            reconcile(&mut backup1, &mut backup2, base.as_ref(), policy)?;

            std::fs::write(&file1, write_backup(&data1, &backup1, both_slots)?)?;
            tracing::info!(path = %file1.display(), "file 1 saved");
            std::fs::write(&file2, write_backup(&data2, &backup2, both_slots)?)?;
            tracing::info!(path = %file2.display(), "file 2 saved");
        }
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn init_logging(cli: &Cli, cfg: &Config) -> Result<(), Box<dyn Error>> {
    if cli.silent && !cli.log_file {
        return Ok(());
    }
    let writer = if cli.log_file {
        BoxMakeWriter::new(Mutex::new(std::fs::File::create(&cfg.log_file)?))
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter)),
        )
        .with_ansi(!cli.log_file)
        .with_writer(writer)
        .init();
    Ok(())
}

fn load_key(hex_arg: Option<&str>, fallback: &Path, what: &str) -> Result<[u8; KEY_LEN], Box<dyn Error>> {
    let bytes = match hex_arg {
        Some(h) => hex::decode(h.trim()).map_err(|e| format!("bad {what} hex: {e}"))?,
        None => std::fs::read(fallback)
            .map_err(|e| format!("no {what} given and {} unreadable: {e}", fallback.display()))?,
    };
    <[u8; KEY_LEN]>::try_from(bytes.as_slice())
        .map_err(|_| format!("{what} must be {KEY_LEN} bytes, got {}", bytes.len()).into())
}

fn parse_timestamp(s: &str) -> Result<Timestamp, String> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(Timestamp::from)
        .ok_or_else(|| format!("unrecognised timestamp '{s}'"))
}

fn write_backup(data: &[u8], backup: &BackupRecord, both_slots: bool) -> Result<Vec<u8>, sysfile::SysfileError> {
    if both_slots {
        update_both(data, backup)
    } else {
        update_record(data, backup, Slot::Primary)
    }
}
