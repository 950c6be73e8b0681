use amfile::sync::{reconcile, BookkeepingPolicy, CreditPolicy, SyncError, SyncPolicy};
use amfile::sysfile::{get_record, update_record, BackupRecord, Slot, FILE_LENGTH};

fn with_credit(credit: u8, remain: u8) -> BackupRecord {
    let mut b = BackupRecord::default();
    b.players[0].credit = credit;
    b.players[0].remain = remain;
    b
}

fn with_total_coin(total_coin: u32) -> BackupRecord {
    let mut b = BackupRecord::default();
    b.bookkeeping.total_coin = total_coin;
    b.bookkeeping.coin_chute[3] = total_coin;
    b
}

fn credits_only(credit: CreditPolicy) -> SyncPolicy {
    SyncPolicy { credit, bookkeeping: BookkeepingPolicy::NoChange }
}

fn bookkeeping_only(bookkeeping: BookkeepingPolicy) -> SyncPolicy {
    SyncPolicy { credit: CreditPolicy::NoChange, bookkeeping }
}

#[test]
fn test_credit_higher_and_lower() {
    let (mut a, mut b) = (with_credit(3, 0), with_credit(7, 1));
    reconcile(&mut a, &mut b, None, credits_only(CreditPolicy::Higher)).unwrap();
    assert_eq!((a.players[0].credit, b.players[0].credit), (7, 7));
    assert_eq!((a.players[0].remain, b.players[0].remain), (1, 1));

    let (mut a, mut b) = (with_credit(3, 0), with_credit(7, 1));
    reconcile(&mut a, &mut b, None, credits_only(CreditPolicy::Lower)).unwrap();
    assert_eq!((a.players[0].credit, b.players[0].credit), (3, 3));
    assert_eq!((a.players[0].remain, b.players[0].remain), (0, 0));
}

#[test]
fn test_credit_file_selection() {
    let (mut a, mut b) = (with_credit(3, 2), with_credit(7, 1));
    reconcile(&mut a, &mut b, None, credits_only(CreditPolicy::File2)).unwrap();
    assert_eq!(a.players[0], b.players[0]);
    assert_eq!(a.players[0].credit, 7);
    assert_eq!(a.players[0].remain, 1);

    let (mut a, mut b) = (with_credit(3, 2), with_credit(7, 1));
    reconcile(&mut a, &mut b, None, credits_only(CreditPolicy::NoChange)).unwrap();
    assert_eq!((a.players[0].credit, b.players[0].credit), (3, 7));
}

#[test]
fn test_credits_only_touch_player_zero() {
    let mut a = with_credit(1, 0);
    let mut b = with_credit(2, 0);
    a.players[1].credit = 9;
    reconcile(&mut a, &mut b, None, credits_only(CreditPolicy::Higher)).unwrap();
    assert_eq!(a.players[1].credit, 9);
    assert_eq!(b.players[1].credit, 0);
}

#[test]
fn test_bookkeeping_combine() {
    let (mut a, mut b) = (with_total_coin(10), with_total_coin(5));
    reconcile(&mut a, &mut b, None, bookkeeping_only(BookkeepingPolicy::Combine)).unwrap();
    assert_eq!(a.bookkeeping.total_coin, 15);
    assert_eq!(b.bookkeeping.total_coin, 15);
    assert_eq!(a.bookkeeping.coin_chute[3], 15);
    assert_eq!(a.bookkeeping, b.bookkeeping);

    let (mut a, mut b) = (with_total_coin(u32::MAX), with_total_coin(5));
    reconcile(&mut a, &mut b, None, bookkeeping_only(BookkeepingPolicy::Combine)).unwrap();
    assert_eq!(a.bookkeeping.total_coin, u32::MAX);
}

#[test]
fn test_bookkeeping_higher_per_field() {
    let mut a = with_total_coin(10);
    let mut b = with_total_coin(5);
    b.bookkeeping.service_credit = 8;
    reconcile(&mut a, &mut b, None, bookkeeping_only(BookkeepingPolicy::Higher)).unwrap();
    assert_eq!(a.bookkeeping.total_coin, 10);
    assert_eq!(a.bookkeeping.service_credit, 8);
    assert_eq!(a.bookkeeping, b.bookkeeping);
}

#[test]
fn test_differential_to_file1() {
    let reference = with_total_coin(5);
    let mut a = with_total_coin(9);
    let mut b = with_total_coin(5);
    reconcile(&mut a, &mut b, Some(&reference), bookkeeping_only(BookkeepingPolicy::DifferentialToFile1)).unwrap();
    assert_eq!(a.bookkeeping.total_coin, 13);
    assert_eq!(b.bookkeeping.total_coin, 9);
}

#[test]
fn test_differential_to_file2_negative_delta() {
    let reference = with_total_coin(5);
    let mut a = with_total_coin(8);
    let mut b = with_total_coin(2);
    reconcile(&mut a, &mut b, Some(&reference), bookkeeping_only(BookkeepingPolicy::DifferentialToFile2)).unwrap();
    assert_eq!(a.bookkeeping.total_coin, 5);
    assert_eq!(b.bookkeeping.total_coin, 0);
}

#[test]
fn test_differential_requires_reference() {
    let mut a = with_credit(3, 0);
    let mut b = with_credit(7, 0);
    let policy = SyncPolicy { credit: CreditPolicy::Higher, bookkeeping: BookkeepingPolicy::DifferentialToFile2 };
    let err = reconcile(&mut a, &mut b, None, policy).unwrap_err();
    assert!(matches!(err, SyncError::MissingReference));
    // Nothing is applied when the call is rejected.
    assert_eq!(a.players[0].credit, 3);
}

#[test]
fn test_each_file_persisted_from_own_buffer() {
    let mut data1 = vec![0u8; FILE_LENGTH];
    let mut data2 = vec![0u8; FILE_LENGTH];
    // Distinct untagged reserved words identify each buffer.
    data1[0x1004] = 0xA1;
    data2[0x1004] = 0xB2;
    data1 = update_record(&data1, &with_credit(2, 0), Slot::Primary).unwrap();
    data2 = update_record(&data2, &with_credit(6, 0), Slot::Primary).unwrap();

    let mut a = get_record::<BackupRecord>(&data1, Slot::Primary).unwrap().record;
    let mut b = get_record::<BackupRecord>(&data2, Slot::Primary).unwrap().record;
    reconcile(&mut a, &mut b, None, credits_only(CreditPolicy::Higher)).unwrap();

    let out1 = update_record(&data1, &a, Slot::Primary).unwrap();
    let out2 = update_record(&data2, &b, Slot::Primary).unwrap();
    assert_eq!(out1[0x1004], 0xA1);
    assert_eq!(out2[0x1004], 0xB2);
    assert_eq!(get_record::<BackupRecord>(&out2, Slot::Primary).unwrap().record.players[0].credit, 6);
    assert_eq!(get_record::<BackupRecord>(&out1, Slot::Primary).unwrap().record.players[0].credit, 6);
}

#[test]
fn test_policy_parsing() {
    assert_eq!("lower".parse::<CreditPolicy>().unwrap(), CreditPolicy::Lower);
    assert_eq!("diff-to-file1".parse::<BookkeepingPolicy>().unwrap(), BookkeepingPolicy::DifferentialToFile1);
    assert!(matches!("sideways".parse::<BookkeepingPolicy>(), Err(SyncError::UnknownPolicy(_))));
}
