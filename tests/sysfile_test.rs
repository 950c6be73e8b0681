use amfile::checksum::{body_checksum, stored_checksum};
use amfile::sysfile::{
    self, get_record, update_both, update_record, AimePayRecord, AnyRecord, BackupRecord, CreditRecord,
    EmoneyRecord, ErrorLogRecord, LocalizeRecord, NetworkRecord, Network1Record, RecordKind, RecordStatus,
    Slot, SysData, SysRecord, SysfileError, TimezoneRecord, FILE_LENGTH, RECORD_TAG,
};
use amfile::layout::FixedStr;
use amfile::types::Timestamp;

fn blank() -> Vec<u8> {
    vec![0u8; FILE_LENGTH]
}

fn sample_backup() -> BackupRecord {
    let mut b = BackupRecord::default();
    b.players[0].credit = 4;
    b.players[0].remain = 1;
    b.bookkeeping.coin_chute[2] = 17;
    b.bookkeeping.total_coin = 120;
    b.bookkeeping.total_credit = 130;
    b.bookkeeping.service_credit = 10;
    b
}

#[test]
fn test_blank_file_is_uninitialized() {
    let data = blank();
    let sys = SysData::parse(&data).unwrap();
    assert_eq!(sys.uninitialized.len(), RecordKind::ALL.len());
    assert!(!sys.is_initialized(RecordKind::Aime));
    assert_eq!(sys.backup, BackupRecord::default());

    let loaded = get_record::<BackupRecord>(&data, Slot::Mirror).unwrap();
    assert_eq!(loaded.status, RecordStatus::Uninitialized);
}

#[test]
fn test_update_then_get_each_slot() {
    let backup = sample_backup();
    for slot in Slot::BOTH {
        let data = update_record(&blank(), &backup, slot).unwrap();
        let loaded = get_record::<BackupRecord>(&data, slot).unwrap();
        assert!(loaded.is_initialized());
        assert_eq!(loaded.record, backup);
    }
}

#[test]
fn test_update_does_not_touch_input_or_other_slot() {
    let original = blank();
    let data = update_record(&original, &sample_backup(), Slot::Primary).unwrap();
    assert_eq!(original, blank());

    let desc = RecordKind::Backup.descriptor();
    assert_ne!(&data[desc.range(Slot::Primary)], &original[desc.range(Slot::Primary)]);
    assert_eq!(&data[desc.range(Slot::Mirror)], &original[desc.range(Slot::Mirror)]);
    assert_eq!(get_record::<BackupRecord>(&data, Slot::Mirror).unwrap().status, RecordStatus::Uninitialized);

    let both = update_both(&original, &sample_backup()).unwrap();
    assert_eq!(get_record::<BackupRecord>(&both, Slot::Mirror).unwrap().record, sample_backup());
}

#[test]
fn test_record_header_bytes() {
    let data = update_record(&blank(), &sample_backup(), Slot::Primary).unwrap();
    let raw = &data[0x1000..0x1200];
    assert_eq!(stored_checksum(raw), Some(body_checksum(raw)));
    assert_eq!(raw[8], 4);

    let aime = update_record(&blank(), &amfile::sysfile::AimeRecord { com_port: 3, unit_index: 0, busy: 1 }, Slot::Mirror)
        .unwrap();
    assert_eq!(u32::from_le_bytes(aime[0x5004..0x5008].try_into().unwrap()), RECORD_TAG);
    assert_eq!(aime[0x5008], 3);
}

#[test]
fn test_zero_checksum_tolerated_bad_checksum_fatal() {
    let mut data = update_record(&blank(), &sample_backup(), Slot::Primary).unwrap();

    data[0x1000..0x1004].copy_from_slice(&[0, 0, 0, 0]);
    let loaded = get_record::<BackupRecord>(&data, Slot::Primary).unwrap();
    assert_eq!(loaded.status, RecordStatus::Uninitialized);
    assert_eq!(loaded.record, sample_backup());

    data[0x1000..0x1004].copy_from_slice(&[1, 0, 0, 0]);
    let err = get_record::<BackupRecord>(&data, Slot::Primary).unwrap_err();
    assert!(matches!(
        err,
        SysfileError::ChecksumMismatch { kind: RecordKind::Backup, offset: 0x1000, stored: 1, .. }
    ));
}

#[test]
fn test_tag_mismatch() {
    let mut data = update_record(&blank(), &EmoneyRecord::default(), Slot::Primary).unwrap();
    get_record::<EmoneyRecord>(&data, Slot::Primary).unwrap();

    // Break the tag, then restore a valid checksum so only the tag is wrong.
    data[0x2204] = b'X';
    let crc = body_checksum(&data[0x2200..0x2800]);
    data[0x2200..0x2204].copy_from_slice(&crc.to_le_bytes());
    let err = get_record::<EmoneyRecord>(&data, Slot::Primary).unwrap_err();
    assert!(matches!(err, SysfileError::TagMismatch { kind: RecordKind::Emoney, expected: RECORD_TAG, .. }));

    // Uninitialized records skip the tag check.
    data[0x2200..0x2204].copy_from_slice(&[0; 4]);
    assert!(get_record::<EmoneyRecord>(&data, Slot::Primary).is_ok());
}

#[test]
fn test_wrong_file_length() {
    let err = get_record::<BackupRecord>(&[0u8; 100], Slot::Primary).unwrap_err();
    assert!(matches!(err, SysfileError::FileLength { expected: FILE_LENGTH, actual: 100 }));
    assert!(update_record(&vec![0u8; FILE_LENGTH + 1], &sample_backup(), Slot::Primary).is_err());
    assert!(SysData::parse(&[]).is_err());
}

#[test]
fn test_rich_records_roundtrip() {
    let mut data = blank();

    let mut credit = CreditRecord::default();
    credit.coin_rate = [1, 1];
    credit.cost = [1, 1, 1, 1, 1, 1, 1, 1];
    credit.coin_amount = 100;
    data = update_record(&data, &credit, Slot::Primary).unwrap();

    let net = Network1Record(NetworkRecord { ip: u32::from_le_bytes([192, 168, 1, 2]), ..NetworkRecord::default() });
    data = update_record(&data, &net, Slot::Primary).unwrap();

    let mut tz = TimezoneRecord::default();
    tz.data[..3].copy_from_slice(b"JST");
    data = update_record(&data, &tz, Slot::Primary).unwrap();

    let mut log = ErrorLogRecord::default();
    log.log_num = 1;
    log.entries[0].game_id = FixedStr::new("SDEZ");
    log.entries[0].error = 6401;
    data = update_record(&data, &log, Slot::Primary).unwrap();

    let localize = LocalizeRecord { region: FixedStr::new("JPN") };
    data = update_record(&data, &localize, Slot::Primary).unwrap();

    let mut emoney = EmoneyRecord::default();
    emoney.terminal_endpoint = FixedStr::new("https://example.invalid/terminal");
    emoney.deal_log.total = 1;
    emoney.deal_log.entries[0].amount = 300;
    emoney.deal_log.entries[0].time = Timestamp { year: 2024, month: 1, day: 2, hour: 3, minute: 4, second: 5 };
    emoney.report_log.entries[4].alarm_amount = -7;
    emoney.send_counter[7] = 9;
    data = update_record(&data, &emoney, Slot::Primary).unwrap();

    let mut aimepay = AimePayRecord::default();
    aimepay.activation.store_name = FixedStr::new("Game Center");
    aimepay.deals[4].receipt_id = u64::MAX;
    aimepay.current_deal.amount = 500;
    data = update_record(&data, &aimepay, Slot::Primary).unwrap();

    let sys = SysData::parse(&data).unwrap();
    assert_eq!(sys.credit, credit);
    assert_eq!(sys.network1, net);
    assert_eq!(sys.network1.0.ip_addr().to_string(), "192.168.1.2");
    assert_eq!(sys.timezone, tz);
    assert_eq!(sys.error_log, log);
    assert_eq!(sys.localize.region.trimmed(), "JPN");
    assert_eq!(sys.emoney, emoney);
    assert_eq!(sys.aimepay, aimepay);
    for kind in [RecordKind::Credit, RecordKind::Emoney, RecordKind::AimePay] {
        assert!(sys.is_initialized(kind), "{kind}");
    }
    assert!(!sys.is_initialized(RecordKind::Dipsw));
}

#[test]
fn test_any_record_by_name() {
    let data = update_record(&blank(), &sample_backup(), Slot::Mirror).unwrap();
    let kind = RecordKind::from_name("BACKUP").unwrap();
    let loaded = AnyRecord::load(&data, kind, Slot::try_from(1).unwrap()).unwrap();
    assert_eq!(loaded.record, AnyRecord::Backup(sample_backup()));
    assert!(matches!(RecordKind::from_name("coins"), Err(SysfileError::UnknownRecord(_))));
}

#[test]
fn test_inspect_reports_every_slot() {
    let mut data = update_record(&blank(), &sample_backup(), Slot::Primary).unwrap();
    data[0x4000] = 0x55;

    let reports = sysfile::inspect(&data).unwrap();
    assert_eq!(reports.len(), 28);

    let status = |kind: RecordKind, slot: Slot| {
        &reports.iter().find(|r| r.kind == kind && r.slot == slot).unwrap().status
    };
    assert!(matches!(status(RecordKind::Backup, Slot::Primary), Ok(RecordStatus::Initialized)));
    assert!(matches!(status(RecordKind::Backup, Slot::Mirror), Err(SysfileError::ChecksumMismatch { .. })));
    assert!(matches!(status(RecordKind::Credit, Slot::Primary), Ok(RecordStatus::Uninitialized)));
}

#[test]
fn test_record_kind_constants() {
    assert_eq!(BackupRecord::KIND, RecordKind::Backup);
    assert_eq!(<BackupRecord as SysRecord>::descriptor().primary_offset, 0x1000);
    assert_eq!(RecordKind::AimePay.descriptor().size, 0x400);
}
