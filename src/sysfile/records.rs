use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use super::table::RecordKind;
use super::{SysRecord, SysfileError};
use crate::layout::{
    pad, read_array, read_bytes, read_u32_array, skip, write_array, write_u32_array, FixedLayout,
    FixedStr,
};
use crate::types::Timestamp;

/// Checksum and tag/reserved word at the start of every record.  Typed
/// records leave these 8 bytes to the codec: they encode as zeros and are
/// skipped on read.
pub const RECORD_HEADER_LEN: usize = 8;

/// Player slots in the credit and backup records.
pub const PLAYER_COUNT: usize = 8;
/// Coin chutes counted in the bookkeeping block.
pub const CHUTE_COUNT: usize = 8;

// ── Credit ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditShareType {
    Default,
    Common,
    Individual,
    Unknown(u8),
}

impl From<u8> for CreditShareType {
    fn from(v: u8) -> Self {
        match v {
            0 => CreditShareType::Default,
            1 => CreditShareType::Common,
            2 => CreditShareType::Individual,
            n => CreditShareType::Unknown(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOperation {
    Default,
    Coin,
    Freeplay,
    Unknown(u8),
}

impl From<u8> for CreditOperation {
    fn from(v: u8) -> Self {
        match v {
            0 => CreditOperation::Default,
            1 => CreditOperation::Coin,
            2 => CreditOperation::Freeplay,
            n => CreditOperation::Unknown(n),
        }
    }
}

/// Credit settings, 512 bytes.  Body layout from offset 8:
/// chute type, service type, operation, 2 coin rates, bonus adder,
/// credit rate, 8 costs, 1 reserved, coin amount (`u16`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreditRecord {
    pub chute_type:   u8,
    pub service_type: u8,
    pub operation:    u8,
    pub coin_rate:    [u8; 2],
    pub bonus_adder:  u8,
    pub credit_rate:  u8,
    pub cost:         [u8; 8],
    pub coin_amount:  u16,
}

impl CreditRecord {
    pub fn chute_share_type(&self) -> CreditShareType {
        CreditShareType::from(self.chute_type)
    }

    pub fn service_share_type(&self) -> CreditShareType {
        CreditShareType::from(self.service_type)
    }

    pub fn operation(&self) -> CreditOperation {
        CreditOperation::from(self.operation)
    }
}

impl FixedLayout for CreditRecord {
    const SIZE: usize = 0x200;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, RECORD_HEADER_LEN)?;
        writer.write_u8(self.chute_type)?;
        writer.write_u8(self.service_type)?;
        writer.write_u8(self.operation)?;
        writer.write_all(&self.coin_rate)?;
        writer.write_u8(self.bonus_adder)?;
        writer.write_u8(self.credit_rate)?;
        writer.write_all(&self.cost)?;
        pad(writer, 1)?;
        writer.write_u16::<LittleEndian>(self.coin_amount)?;
        pad(writer, Self::SIZE - 26)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, RECORD_HEADER_LEN)?;
        let chute_type = reader.read_u8()?;
        let service_type = reader.read_u8()?;
        let operation = reader.read_u8()?;
        let coin_rate = read_bytes(reader)?;
        let bonus_adder = reader.read_u8()?;
        let credit_rate = reader.read_u8()?;
        let cost = read_bytes(reader)?;
        skip(reader, 1)?;
        let coin_amount = reader.read_u16::<LittleEndian>()?;
        skip(reader, Self::SIZE - 26)?;
        Ok(Self {
            chute_type,
            service_type,
            operation,
            coin_rate,
            bonus_adder,
            credit_rate,
            cost,
            coin_amount,
        })
    }
}

impl SysRecord for CreditRecord {
    const KIND: RecordKind = RecordKind::Credit;
}

// ── Network ───────────────────────────────────────────────────────────────────

/// Network configuration.  Addresses are kept as raw little-endian words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkRecord {
    pub flags:   u32,
    pub ip:      u32,
    pub mask:    u32,
    pub gateway: u32,
    pub dns1:    u32,
    pub dns2:    u32,
}

impl NetworkRecord {
    pub fn ip_addr(&self) -> std::net::Ipv4Addr {
        std::net::Ipv4Addr::from(self.ip.to_le_bytes())
    }
}

impl FixedLayout for NetworkRecord {
    const SIZE: usize = 0x200;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, RECORD_HEADER_LEN)?;
        write_u32_array(writer, &[self.flags, self.ip, self.mask, self.gateway, self.dns1, self.dns2])?;
        pad(writer, Self::SIZE - 32)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, RECORD_HEADER_LEN)?;
        let [flags, ip, mask, gateway, dns1, dns2] = read_u32_array::<_, 6>(reader)?;
        skip(reader, Self::SIZE - 32)?;
        Ok(Self { flags, ip, mask, gateway, dns1, dns2 })
    }
}

/// First network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Network0Record(pub NetworkRecord);

/// Second network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Network1Record(pub NetworkRecord);

impl FixedLayout for Network0Record {
    const SIZE: usize = NetworkRecord::SIZE;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.0.write(writer)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        NetworkRecord::read(reader).map(Self)
    }
}

impl FixedLayout for Network1Record {
    const SIZE: usize = NetworkRecord::SIZE;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.0.write(writer)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        NetworkRecord::read(reader).map(Self)
    }
}

impl SysRecord for Network0Record {
    const KIND: RecordKind = RecordKind::Network0;
}

impl SysRecord for Network1Record {
    const KIND: RecordKind = RecordKind::Network1;
}

// ── Backup (credits + bookkeeping) ────────────────────────────────────────────

/// Credits held by one player slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerCredit {
    pub credit: u8,
    pub remain: u8,
}

impl FixedLayout for PlayerCredit {
    const SIZE: usize = 2;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.credit)?;
        writer.write_u8(self.remain)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self { credit: reader.read_u8()?, remain: reader.read_u8()? })
    }
}

/// Lifetime coin and credit counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bookkeeping {
    pub coin_chute:     [u32; CHUTE_COUNT],
    pub emoney_coin:    u32,
    pub emoney_credit:  u32,
    pub total_coin:     u32,
    pub coin_credit:    u32,
    pub service_credit: u32,
    pub total_credit:   u32,
}

/// Player credits and bookkeeping counters, 512 bytes.
///
/// | Off | Len | Field |
/// |-----|-----|-------|
/// | 8   | 16  | 8 × (credit, remain) |
/// | 72  | 32  | coin chute counters |
/// | 192 | 24  | emoney coin, emoney credit, total coin, coin credit, service credit, total credit |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupRecord {
    pub players:     [PlayerCredit; PLAYER_COUNT],
    pub bookkeeping: Bookkeeping,
}

impl BackupRecord {
    /// Credit `amount` coins to `player` through `chute`, keeping the
    /// bookkeeping totals in step.
    pub fn insert_coins(&mut self, amount: u32, chute: usize, player: usize) -> Result<(), SysfileError> {
        check_index("chute", chute, CHUTE_COUNT)?;
        check_index("player", player, PLAYER_COUNT)?;

        let credit = &mut self.players[player].credit;
        *credit = credit.saturating_add(u8::try_from(amount).unwrap_or(u8::MAX));

        let bk = &mut self.bookkeeping;
        bk.coin_chute[chute] = bk.coin_chute[chute].saturating_add(amount);
        bk.coin_credit = bk.coin_credit.saturating_add(amount);
        bk.total_coin = bk.total_coin.saturating_add(amount);
        bk.total_credit = bk.total_credit.saturating_add(amount);
        Ok(())
    }

    /// Take up to `amount` credits from `player`.  Counters are left alone.
    pub fn remove_coins(&mut self, amount: u32, player: usize) -> Result<(), SysfileError> {
        check_index("player", player, PLAYER_COUNT)?;
        let credit = &mut self.players[player].credit;
        *credit = credit.saturating_sub(u8::try_from(amount).unwrap_or(u8::MAX));
        Ok(())
    }
}

fn check_index(field: &'static str, index: usize, len: usize) -> Result<(), SysfileError> {
    if index < len {
        Ok(())
    } else {
        Err(SysfileError::IndexOutOfRange { field, index, len })
    }
}

impl FixedLayout for BackupRecord {
    const SIZE: usize = 0x200;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, RECORD_HEADER_LEN)?;
        write_array(writer, &self.players)?;
        pad(writer, 48)?;
        let bk = &self.bookkeeping;
        write_u32_array(writer, &bk.coin_chute)?;
        pad(writer, 88)?;
        write_u32_array(
            writer,
            &[
                bk.emoney_coin,
                bk.emoney_credit,
                bk.total_coin,
                bk.coin_credit,
                bk.service_credit,
                bk.total_credit,
            ],
        )?;
        pad(writer, Self::SIZE - 216)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, RECORD_HEADER_LEN)?;
        let players = read_array(reader)?;
        skip(reader, 48)?;
        let coin_chute = read_u32_array(reader)?;
        skip(reader, 88)?;
        let [emoney_coin, emoney_credit, total_coin, coin_credit, service_credit, total_credit] =
            read_u32_array::<_, 6>(reader)?;
        skip(reader, Self::SIZE - 216)?;
        Ok(Self {
            players,
            bookkeeping: Bookkeeping {
                coin_chute,
                emoney_coin,
                emoney_credit,
                total_coin,
                coin_credit,
                service_credit,
                total_credit,
            },
        })
    }
}

impl SysRecord for BackupRecord {
    const KIND: RecordKind = RecordKind::Backup;
}

// ── Timezone ──────────────────────────────────────────────────────────────────

pub const TIMEZONE_DATA_LEN: usize = 0x200 - RECORD_HEADER_LEN;

/// Timezone settings.  The body has no known structure and is carried
/// byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneRecord {
    pub data: [u8; TIMEZONE_DATA_LEN],
}

impl Default for TimezoneRecord {
    fn default() -> Self {
        Self { data: [0u8; TIMEZONE_DATA_LEN] }
    }
}

impl FixedLayout for TimezoneRecord {
    const SIZE: usize = 0x200;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, RECORD_HEADER_LEN)?;
        writer.write_all(&self.data)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, RECORD_HEADER_LEN)?;
        Ok(Self { data: read_bytes(reader)? })
    }
}

impl SysRecord for TimezoneRecord {
    const KIND: RecordKind = RecordKind::Timezone;
}

// ── Error log ─────────────────────────────────────────────────────────────────

pub const ERROR_LOG_CAPACITY: usize = 15;

/// One logged error, 32 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorEntry {
    pub time:            u64,
    pub game_id:         FixedStr<4>,
    pub error:           u16,
    pub app_start_count: u8,
    pub sub_error:       u16,
}

impl FixedLayout for ErrorEntry {
    const SIZE: usize = 32;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u64::<LittleEndian>(self.time)?;
        self.game_id.write(writer)?;
        writer.write_u16::<LittleEndian>(self.error)?;
        writer.write_u8(self.app_start_count)?;
        pad(writer, 1)?;
        writer.write_u16::<LittleEndian>(self.sub_error)?;
        pad(writer, 14)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let time = reader.read_u64::<LittleEndian>()?;
        let game_id = FixedStr::read(reader)?;
        let error = reader.read_u16::<LittleEndian>()?;
        let app_start_count = reader.read_u8()?;
        skip(reader, 1)?;
        let sub_error = reader.read_u16::<LittleEndian>()?;
        skip(reader, 14)?;
        Ok(Self { time, game_id, error, app_start_count, sub_error })
    }
}

/// Ring of the last 15 errors, 512 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorLogRecord {
    pub write_pointer:     u8,
    pub log_num:           u8,
    pub active_last_error: u8,
    pub entries:           [ErrorEntry; ERROR_LOG_CAPACITY],
}

impl ErrorLogRecord {
    /// Logged entries, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &ErrorEntry> {
        let count = usize::from(self.log_num).min(ERROR_LOG_CAPACITY);
        let start = if count < ERROR_LOG_CAPACITY { 0 } else { usize::from(self.write_pointer) % ERROR_LOG_CAPACITY };
        (0..count).map(move |i| &self.entries[(start + i) % ERROR_LOG_CAPACITY])
    }
}

impl FixedLayout for ErrorLogRecord {
    const SIZE: usize = 0x200;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, RECORD_HEADER_LEN)?;
        writer.write_u8(self.write_pointer)?;
        writer.write_u8(self.log_num)?;
        writer.write_u8(self.active_last_error)?;
        pad(writer, 21)?;
        write_array(writer, &self.entries)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, RECORD_HEADER_LEN)?;
        let write_pointer = reader.read_u8()?;
        let log_num = reader.read_u8()?;
        let active_last_error = reader.read_u8()?;
        skip(reader, 21)?;
        Ok(Self { write_pointer, log_num, active_last_error, entries: read_array(reader)? })
    }
}

impl SysRecord for ErrorLogRecord {
    const KIND: RecordKind = RecordKind::ErrorLog;
}

// ── Small settings records ────────────────────────────────────────────────────

/// Region code such as `JPN`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalizeRecord {
    pub region: FixedStr<8>,
}

impl FixedLayout for LocalizeRecord {
    const SIZE: usize = 0x200;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, RECORD_HEADER_LEN)?;
        self.region.write(writer)?;
        pad(writer, Self::SIZE - 16)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, RECORD_HEADER_LEN)?;
        let region = FixedStr::read(reader)?;
        skip(reader, Self::SIZE - 16)?;
        Ok(Self { region })
    }
}

impl SysRecord for LocalizeRecord {
    const KIND: RecordKind = RecordKind::Localize;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WlanRecord {
    pub config:  u32,
    pub channel: u32,
}

impl FixedLayout for WlanRecord {
    const SIZE: usize = 0x200;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, RECORD_HEADER_LEN)?;
        writer.write_u32::<LittleEndian>(self.config)?;
        writer.write_u32::<LittleEndian>(self.channel)?;
        pad(writer, Self::SIZE - 16)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, RECORD_HEADER_LEN)?;
        let config = reader.read_u32::<LittleEndian>()?;
        let channel = reader.read_u32::<LittleEndian>()?;
        skip(reader, Self::SIZE - 16)?;
        Ok(Self { config, channel })
    }
}

impl SysRecord for WlanRecord {
    const KIND: RecordKind = RecordKind::Wlan;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayRecord {
    pub mode: u32,
}

impl FixedLayout for DisplayRecord {
    const SIZE: usize = 0x200;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, RECORD_HEADER_LEN)?;
        writer.write_u32::<LittleEndian>(self.mode)?;
        pad(writer, Self::SIZE - 12)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, RECORD_HEADER_LEN)?;
        let mode = reader.read_u32::<LittleEndian>()?;
        skip(reader, Self::SIZE - 12)?;
        Ok(Self { mode })
    }
}

impl SysRecord for DisplayRecord {
    const KIND: RecordKind = RecordKind::Display;
}

/// Card reader firmware update progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AimeRecord {
    pub com_port:   u8,
    pub unit_index: u8,
    pub busy:       u8,
}

impl FixedLayout for AimeRecord {
    const SIZE: usize = 0x200;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, RECORD_HEADER_LEN)?;
        writer.write_all(&[self.com_port, self.unit_index, self.busy])?;
        pad(writer, Self::SIZE - 11)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, RECORD_HEADER_LEN)?;
        let [com_port, unit_index, busy] = read_bytes(reader)?;
        skip(reader, Self::SIZE - 11)?;
        Ok(Self { com_port, unit_index, busy })
    }
}

impl SysRecord for AimeRecord {
    const KIND: RecordKind = RecordKind::Aime;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DipswRecord {
    pub value: u8,
}

impl DipswRecord {
    /// State of switch `n` (0-based).
    pub fn switch(&self, n: u8) -> bool {
        n < 8 && self.value & (1 << n) != 0
    }
}

impl FixedLayout for DipswRecord {
    const SIZE: usize = 0x200;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, RECORD_HEADER_LEN)?;
        writer.write_u8(self.value)?;
        pad(writer, Self::SIZE - 9)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, RECORD_HEADER_LEN)?;
        let value = reader.read_u8()?;
        skip(reader, Self::SIZE - 9)?;
        Ok(Self { value })
    }
}

impl SysRecord for DipswRecord {
    const KIND: RecordKind = RecordKind::Dipsw;
}

/// Marker record with no fields of its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreditClearRecord;

impl FixedLayout for CreditClearRecord {
    const SIZE: usize = 0x200;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, Self::SIZE)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, Self::SIZE)?;
        Ok(Self)
    }
}

impl SysRecord for CreditClearRecord {
    const KIND: RecordKind = RecordKind::CreditClear;
}

// ── E-money ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmoneyBrand {
    None,
    Nanaco,
    Edy,
    Id,
    Transport,
    Waon,
    Paseli,
    Sapica,
    Unknown(u8),
}

impl From<u8> for EmoneyBrand {
    fn from(v: u8) -> Self {
        match v {
            0 => EmoneyBrand::None,
            1 => EmoneyBrand::Nanaco,
            2 => EmoneyBrand::Edy,
            3 => EmoneyBrand::Id,
            4 => EmoneyBrand::Transport,
            5 => EmoneyBrand::Waon,
            6 => EmoneyBrand::Paseli,
            7 => EmoneyBrand::Sapica,
            n => EmoneyBrand::Unknown(n),
        }
    }
}

pub const DEAL_LOG_CAPACITY: usize = 8;
pub const REPORT_LOG_CAPACITY: usize = 5;

/// One e-money transaction, 68 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DealEntry {
    pub status:         u8,
    pub brand:          u8,
    pub deal_number:    FixedStr<16>,
    pub card_number:    FixedStr<21>,
    pub state:          u8,
    pub time:           Timestamp,
    pub amount:         u32,
    pub before_balance: u32,
    pub after_balance:  u32,
    pub price:          u32,
    pub quantity:       u32,
}

impl DealEntry {
    pub fn brand(&self) -> EmoneyBrand {
        EmoneyBrand::from(self.brand)
    }
}

impl FixedLayout for DealEntry {
    const SIZE: usize = 68;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.status)?;
        writer.write_u8(self.brand)?;
        self.deal_number.write(writer)?;
        self.card_number.write(writer)?;
        writer.write_u8(self.state)?;
        self.time.write(writer)?;
        write_u32_array(
            writer,
            &[self.amount, self.before_balance, self.after_balance, self.price, self.quantity],
        )
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let status = reader.read_u8()?;
        let brand = reader.read_u8()?;
        let deal_number = FixedStr::read(reader)?;
        let card_number = FixedStr::read(reader)?;
        let state = reader.read_u8()?;
        let time = Timestamp::read(reader)?;
        let [amount, before_balance, after_balance, price, quantity] = read_u32_array::<_, 5>(reader)?;
        Ok(Self {
            status,
            brand,
            deal_number,
            card_number,
            state,
            time,
            amount,
            before_balance,
            after_balance,
            price,
            quantity,
        })
    }
}

/// Transaction log, 548 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DealLog {
    pub total:     u16,
    pub add_point: u16,
    pub entries:   [DealEntry; DEAL_LOG_CAPACITY],
}

impl FixedLayout for DealLog {
    const SIZE: usize = 4 + DEAL_LOG_CAPACITY * DealEntry::SIZE;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.total)?;
        writer.write_u16::<LittleEndian>(self.add_point)?;
        write_array(writer, &self.entries)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let total = reader.read_u16::<LittleEndian>()?;
        let add_point = reader.read_u16::<LittleEndian>()?;
        Ok(Self { total, add_point, entries: read_array(reader)? })
    }
}

/// Daily sales report, 28 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportEntry {
    pub status:       i32,
    pub time:         Timestamp,
    pub count:        i32,
    pub amount:       i32,
    pub alarm_count:  i32,
    pub alarm_amount: i32,
}

impl FixedLayout for ReportEntry {
    const SIZE: usize = 28;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i32::<LittleEndian>(self.status)?;
        self.time.write(writer)?;
        writer.write_i32::<LittleEndian>(self.count)?;
        writer.write_i32::<LittleEndian>(self.amount)?;
        writer.write_i32::<LittleEndian>(self.alarm_count)?;
        writer.write_i32::<LittleEndian>(self.alarm_amount)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            status:       reader.read_i32::<LittleEndian>()?,
            time:         Timestamp::read(reader)?,
            count:        reader.read_i32::<LittleEndian>()?,
            amount:       reader.read_i32::<LittleEndian>()?,
            alarm_count:  reader.read_i32::<LittleEndian>()?,
            alarm_amount: reader.read_i32::<LittleEndian>()?,
        })
    }
}

/// Report log, 144 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportLog {
    pub total:     u16,
    pub add_point: u16,
    pub entries:   [ReportEntry; REPORT_LOG_CAPACITY],
}

impl FixedLayout for ReportLog {
    const SIZE: usize = 4 + REPORT_LOG_CAPACITY * ReportEntry::SIZE;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.total)?;
        writer.write_u16::<LittleEndian>(self.add_point)?;
        write_array(writer, &self.entries)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let total = reader.read_u16::<LittleEndian>()?;
        let add_point = reader.read_u16::<LittleEndian>()?;
        Ok(Self { total, add_point, entries: read_array(reader)? })
    }
}

/// In-flight purchase, 48 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurrentDeal {
    pub keychip_id: FixedStr<11>,
    pub game_id:    FixedStr<4>,
    pub user_id:    FixedStr<8>,
    pub item_id:    FixedStr<8>,
    pub price:      u32,
    pub quantity:   u32,
    pub state:      u8,
}

impl FixedLayout for CurrentDeal {
    const SIZE: usize = 48;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.keychip_id.write(writer)?;
        self.game_id.write(writer)?;
        self.user_id.write(writer)?;
        self.item_id.write(writer)?;
        pad(writer, 5)?;
        writer.write_u32::<LittleEndian>(self.price)?;
        writer.write_u32::<LittleEndian>(self.quantity)?;
        writer.write_u8(self.state)?;
        pad(writer, 3)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let keychip_id = FixedStr::read(reader)?;
        let game_id = FixedStr::read(reader)?;
        let user_id = FixedStr::read(reader)?;
        let item_id = FixedStr::read(reader)?;
        skip(reader, 5)?;
        let price = reader.read_u32::<LittleEndian>()?;
        let quantity = reader.read_u32::<LittleEndian>()?;
        let state = reader.read_u8()?;
        skip(reader, 3)?;
        Ok(Self { keychip_id, game_id, user_id, item_id, price, quantity, state })
    }
}

/// E-money terminal state, 1536 bytes.
///
/// | Off  | Len | Field |
/// |------|-----|-------|
/// | 8    | 4   | available brands |
/// | 12   | 128 | terminal endpoint |
/// | 140  | 16  | deal number |
/// | 156  | 4   | terminal deal number |
/// | 160  | 4   | closing number |
/// | 164  | 548 | deal log |
/// | 712  | 548 | cash deal log |
/// | 1260 | 144 | report log |
/// | 1404 | 32  | send counters |
/// | 1436 | 4   | authorised brands |
/// | 1440 | 48  | current deal |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmoneyRecord {
    pub available_brands:     u32,
    pub terminal_endpoint:    FixedStr<128>,
    pub deal_number:          FixedStr<16>,
    pub terminal_deal_number: u32,
    pub closing_number:       i32,
    pub deal_log:             DealLog,
    pub cash_deal_log:        DealLog,
    pub report_log:           ReportLog,
    pub send_counter:         [u32; 8],
    pub auth_brands:          u32,
    pub current_deal:         CurrentDeal,
}

impl FixedLayout for EmoneyRecord {
    const SIZE: usize = 0x600;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, RECORD_HEADER_LEN)?;
        writer.write_u32::<LittleEndian>(self.available_brands)?;
        self.terminal_endpoint.write(writer)?;
        self.deal_number.write(writer)?;
        writer.write_u32::<LittleEndian>(self.terminal_deal_number)?;
        writer.write_i32::<LittleEndian>(self.closing_number)?;
        self.deal_log.write(writer)?;
        self.cash_deal_log.write(writer)?;
        self.report_log.write(writer)?;
        write_u32_array(writer, &self.send_counter)?;
        writer.write_u32::<LittleEndian>(self.auth_brands)?;
        self.current_deal.write(writer)?;
        pad(writer, Self::SIZE - 1488)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, RECORD_HEADER_LEN)?;
        let available_brands = reader.read_u32::<LittleEndian>()?;
        let terminal_endpoint = FixedStr::read(reader)?;
        let deal_number = FixedStr::read(reader)?;
        let terminal_deal_number = reader.read_u32::<LittleEndian>()?;
        let closing_number = reader.read_i32::<LittleEndian>()?;
        let deal_log = DealLog::read(reader)?;
        let cash_deal_log = DealLog::read(reader)?;
        let report_log = ReportLog::read(reader)?;
        let send_counter = read_u32_array(reader)?;
        let auth_brands = reader.read_u32::<LittleEndian>()?;
        let current_deal = CurrentDeal::read(reader)?;
        skip(reader, Self::SIZE - 1488)?;
        Ok(Self {
            available_brands,
            terminal_endpoint,
            deal_number,
            terminal_deal_number,
            closing_number,
            deal_log,
            cash_deal_log,
            report_log,
            send_counter,
            auth_brands,
            current_deal,
        })
    }
}

impl SysRecord for EmoneyRecord {
    const KIND: RecordKind = RecordKind::Emoney;
}

// ── AimePay ───────────────────────────────────────────────────────────────────

pub const AIMEPAY_LOG_CAPACITY: usize = 5;

/// Store the terminal was activated for, 216 bytes including reserved tail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AimePayActivation {
    pub store_code:   FixedStr<11>,
    pub store_name:   FixedStr<61>,
    pub company_code: FixedStr<11>,
    pub company_name: FixedStr<121>,
}

impl FixedLayout for AimePayActivation {
    const SIZE: usize = 216;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.store_code.write(writer)?;
        self.store_name.write(writer)?;
        self.company_code.write(writer)?;
        self.company_name.write(writer)?;
        pad(writer, 12)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let store_code = FixedStr::read(reader)?;
        let store_name = FixedStr::read(reader)?;
        let company_code = FixedStr::read(reader)?;
        let company_name = FixedStr::read(reader)?;
        skip(reader, 12)?;
        Ok(Self { store_code, store_name, company_code, company_name })
    }
}

/// One AimePay transaction, 72 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AimePayDeal {
    pub state:          u8,
    pub status:         u8,
    pub error_category: u32,
    pub error_code:     FixedStr<16>,
    pub time:           Timestamp,
    pub access_code:    [u8; 10],
    pub item_id:        FixedStr<8>,
    pub receipt_id:     u64,
    pub quantity:       u32,
    pub amount:         u32,
}

impl FixedLayout for AimePayDeal {
    const SIZE: usize = 72;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.state)?;
        writer.write_u8(self.status)?;
        pad(writer, 2)?;
        writer.write_u32::<LittleEndian>(self.error_category)?;
        self.error_code.write(writer)?;
        self.time.write(writer)?;
        writer.write_all(&self.access_code)?;
        self.item_id.write(writer)?;
        pad(writer, 6)?;
        writer.write_u64::<LittleEndian>(self.receipt_id)?;
        writer.write_u32::<LittleEndian>(self.quantity)?;
        writer.write_u32::<LittleEndian>(self.amount)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let state = reader.read_u8()?;
        let status = reader.read_u8()?;
        skip(reader, 2)?;
        let error_category = reader.read_u32::<LittleEndian>()?;
        let error_code = FixedStr::read(reader)?;
        let time = Timestamp::read(reader)?;
        let access_code = read_bytes(reader)?;
        let item_id = FixedStr::read(reader)?;
        skip(reader, 6)?;
        let receipt_id = reader.read_u64::<LittleEndian>()?;
        let quantity = reader.read_u32::<LittleEndian>()?;
        let amount = reader.read_u32::<LittleEndian>()?;
        Ok(Self {
            state,
            status,
            error_category,
            error_code,
            time,
            access_code,
            item_id,
            receipt_id,
            quantity,
            amount,
        })
    }
}

/// In-flight AimePay purchase, 48 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AimePayCurrentDeal {
    pub access_code: [u8; 10],
    pub item_id:     FixedStr<8>,
    pub time:        Timestamp,
    pub amount:      u32,
    pub quantity:    u32,
    pub state:       u8,
}

impl FixedLayout for AimePayCurrentDeal {
    const SIZE: usize = 48;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.access_code)?;
        pad(writer, 6)?;
        self.item_id.write(writer)?;
        self.time.write(writer)?;
        writer.write_u32::<LittleEndian>(self.amount)?;
        writer.write_u32::<LittleEndian>(self.quantity)?;
        writer.write_u8(self.state)?;
        pad(writer, 7)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let access_code = read_bytes(reader)?;
        skip(reader, 6)?;
        let item_id = FixedStr::read(reader)?;
        let time = Timestamp::read(reader)?;
        let amount = reader.read_u32::<LittleEndian>()?;
        let quantity = reader.read_u32::<LittleEndian>()?;
        let state = reader.read_u8()?;
        skip(reader, 7)?;
        Ok(Self { access_code, item_id, time, amount, quantity, state })
    }
}

/// AimePay terminal state, 1024 bytes.
///
/// | Off | Len | Field |
/// |-----|-----|-------|
/// | 8   | 216 | activation |
/// | 224 | 2   | deal log total |
/// | 226 | 2   | deal log add point |
/// | 232 | 360 | 5 deals |
/// | 592 | 48  | current deal |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AimePayRecord {
    pub activation:     AimePayActivation,
    pub deal_total:     u16,
    pub deal_add_point: u16,
    pub deals:          [AimePayDeal; AIMEPAY_LOG_CAPACITY],
    pub current_deal:   AimePayCurrentDeal,
}

impl FixedLayout for AimePayRecord {
    const SIZE: usize = 0x400;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        pad(writer, RECORD_HEADER_LEN)?;
        self.activation.write(writer)?;
        writer.write_u16::<LittleEndian>(self.deal_total)?;
        writer.write_u16::<LittleEndian>(self.deal_add_point)?;
        pad(writer, 4)?;
        write_array(writer, &self.deals)?;
        self.current_deal.write(writer)?;
        pad(writer, Self::SIZE - 640)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        skip(reader, RECORD_HEADER_LEN)?;
        let activation = AimePayActivation::read(reader)?;
        let deal_total = reader.read_u16::<LittleEndian>()?;
        let deal_add_point = reader.read_u16::<LittleEndian>()?;
        skip(reader, 4)?;
        let deals = read_array(reader)?;
        let current_deal = AimePayCurrentDeal::read(reader)?;
        skip(reader, Self::SIZE - 640)?;
        Ok(Self { activation, deal_total, deal_add_point, deals, current_deal })
    }
}

impl SysRecord for AimePayRecord {
    const KIND: RecordKind = RecordKind::AimePay;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{decode, encode};
    use byteorder::ByteOrder;

    #[test]
    fn nested_sizes_add_up() {
        assert_eq!(DealLog::SIZE, 548);
        assert_eq!(ReportLog::SIZE, 144);
        assert_eq!(encode(&EmoneyRecord::default()).unwrap().len(), 0x600);
        assert_eq!(encode(&AimePayRecord::default()).unwrap().len(), 0x400);
        assert_eq!(encode(&ErrorLogRecord::default()).unwrap().len(), 0x200);
    }

    #[test]
    fn backup_field_offsets() {
        let mut rec = BackupRecord::default();
        rec.players[1] = PlayerCredit { credit: 3, remain: 4 };
        rec.bookkeeping.coin_chute[0] = 0x11;
        rec.bookkeeping.total_coin = 0x22;
        rec.bookkeeping.total_credit = 0x33;
        let raw = encode(&rec).unwrap();
        assert_eq!(&raw[..8], &[0u8; 8]);
        assert_eq!(raw[10], 3);
        assert_eq!(raw[11], 4);
        assert_eq!(LittleEndian::read_u32(&raw[72..]), 0x11);
        assert_eq!(LittleEndian::read_u32(&raw[200..]), 0x22);
        assert_eq!(LittleEndian::read_u32(&raw[212..]), 0x33);
        assert_eq!(decode::<BackupRecord>(&raw).unwrap(), rec);
    }

    #[test]
    fn emoney_and_aimepay_offsets() {
        let mut em = EmoneyRecord::default();
        em.closing_number = -1;
        em.current_deal.price = 500;
        let raw = encode(&em).unwrap();
        assert_eq!(LittleEndian::read_i32(&raw[160..]), -1);
        assert_eq!(LittleEndian::read_u32(&raw[1440 + 36..]), 500);

        let mut ap = AimePayRecord::default();
        ap.deal_total = 2;
        ap.deals[0].receipt_id = 0xDEAD_BEEF;
        ap.current_deal.state = 7;
        let raw = encode(&ap).unwrap();
        assert_eq!(LittleEndian::read_u16(&raw[224..]), 2);
        assert_eq!(LittleEndian::read_u64(&raw[232 + 56..]), 0xDEAD_BEEF);
        assert_eq!(raw[632], 7);
    }

    #[test]
    fn credit_setting_values() {
        let credit = CreditRecord { chute_type: 2, service_type: 1, operation: 2, ..Default::default() };
        assert_eq!(credit.operation(), CreditOperation::Freeplay);
        assert_eq!(credit.service_share_type(), CreditShareType::Common);
        assert_eq!(credit.chute_share_type(), CreditShareType::Individual);

        let ops: Vec<_> = (0u8..4).map(CreditOperation::from).collect();
        assert_eq!(ops, [
            CreditOperation::Default,
            CreditOperation::Coin,
            CreditOperation::Freeplay,
            CreditOperation::Unknown(3),
        ]);
        let shares: Vec<_> = (0u8..4).map(CreditShareType::from).collect();
        assert_eq!(shares, [
            CreditShareType::Default,
            CreditShareType::Common,
            CreditShareType::Individual,
            CreditShareType::Unknown(3),
        ]);
    }

    #[test]
    fn emoney_brand_values() {
        let brands: Vec<_> = (0u8..9).map(EmoneyBrand::from).collect();
        assert_eq!(brands, [
            EmoneyBrand::None,
            EmoneyBrand::Nanaco,
            EmoneyBrand::Edy,
            EmoneyBrand::Id,
            EmoneyBrand::Transport,
            EmoneyBrand::Waon,
            EmoneyBrand::Paseli,
            EmoneyBrand::Sapica,
            EmoneyBrand::Unknown(8),
        ]);
        let deal = DealEntry { brand: 6, ..Default::default() };
        assert_eq!(deal.brand(), EmoneyBrand::Paseli);
    }

    #[test]
    fn insert_and_remove_coins() {
        let mut rec = BackupRecord::default();
        rec.insert_coins(3, 1, 0).unwrap();
        assert_eq!(rec.players[0].credit, 3);
        assert_eq!(rec.bookkeeping.coin_chute[1], 3);
        assert_eq!(rec.bookkeeping.total_coin, 3);
        assert_eq!(rec.bookkeeping.coin_credit, 3);
        assert_eq!(rec.bookkeeping.total_credit, 3);

        rec.remove_coins(5, 0).unwrap();
        assert_eq!(rec.players[0].credit, 0);
        assert_eq!(rec.bookkeeping.total_coin, 3);

        assert!(rec.insert_coins(1, CHUTE_COUNT, 0).is_err());
        assert!(rec.remove_coins(1, PLAYER_COUNT).is_err());
    }

    #[test]
    fn error_log_ring_order() {
        let mut log = ErrorLogRecord::default();
        for (i, e) in log.entries.iter_mut().enumerate() {
            e.error = i as u16;
        }
        log.log_num = 3;
        assert_eq!(log.recent().map(|e| e.error).collect::<Vec<_>>(), [0, 1, 2]);

        log.log_num = ERROR_LOG_CAPACITY as u8;
        log.write_pointer = 4;
        let order: Vec<u16> = log.recent().map(|e| e.error).collect();
        assert_eq!(order.first(), Some(&4));
        assert_eq!(order.last(), Some(&3));
    }
}
