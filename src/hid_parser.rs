//! USB HID 1.11 report descriptor parser.
//!
//! Parses a raw report descriptor into a flat, report-id-indexed pool of
//! [`MainItem`]s, and decodes inbound reports against that pool. The
//! item-tag tables below are USB HID 1.11 §6.2.2 verbatim.

use std::collections::BTreeMap;

/// HID usage pages referenced by the concrete driver classes and by the
/// descriptor-application-usage scenario.
pub mod usage_page {
    pub const GENERIC_DESKTOP: u16 = 0x01;
    pub const BUTTON: u16 = 0x09;
}

/// Usages on the Generic Desktop page used to classify a device's
/// application collection.
pub mod usage {
    pub const JOYSTICK: u16 = 0x04;
    pub const GAME_PAD: u16 = 0x05;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserStatus {
    Ok,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Input,
    Output,
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectionType {
    Physical,
    Application,
    Logical,
    Report,
    NamedArray,
    UsageSwitch,
    UsageModifier,
    Reserved,
}

impl CollectionType {
    fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Physical,
            0x01 => Self::Application,
            0x02 => Self::Logical,
            0x03 => Self::Report,
            0x04 => Self::NamedArray,
            0x05 => Self::UsageSwitch,
            0x06 => Self::UsageModifier,
            _ => Self::Reserved,
        }
    }
}

/// The nine HID main-item data flag bits (USB HID 1.11 §6.2.2.5), in bit
/// order 0..8: Constant, Variable, Relative, Wrap, NonLinear, NoPreferred,
/// NullState, Volatile, BufferedBytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainItem {
    pub flags: u32,
    pub usage_page: u16,
    pub usage: u16,
    pub logical_min: i32,
    pub logical_max: i32,
    pub report_size_bits: u32,
    pub report_id: u8,
}

macro_rules! flag_bit {
    ($name:ident, $bit:expr) => {
        pub fn $name(&self) -> bool {
            self.flags & (1 << $bit) != 0
        }
    };
}

impl MainItem {
    flag_bit!(is_constant, 0);
    flag_bit!(is_variable, 1);
    flag_bit!(is_relative, 2);
    flag_bit!(is_wrap, 3);
    flag_bit!(is_nonlinear, 4);
    flag_bit!(is_no_preferred, 5);
    flag_bit!(is_null_state, 6);
    flag_bit!(is_volatile, 7);
    flag_bit!(is_buffered_bytes, 8);
}

#[derive(Default, Clone)]
struct GlobalState {
    usage_page: u16,
    logical_min: i32,
    logical_max: i32,
    physical_min: i32,
    physical_max: i32,
    unit_exponent: i32,
    unit: u32,
    report_size: u32,
    report_id: u8,
    report_count: u32,
}

#[derive(Default, Clone)]
struct LocalState {
    usage_list: Vec<u16>,
    usage_min: u16,
    usage_max: u16,
}

impl LocalState {
    fn has_range(&self) -> bool {
        self.usage_max > self.usage_min
    }

    fn usage_for_index(&self, i: u32) -> u16 {
        if self.has_range() {
            self.usage_min + i as u16
        } else if let Some(&first) = self.usage_list.first() {
            self.usage_list.get(i as usize).copied().unwrap_or(first)
        } else {
            0
        }
    }
}

/// Short-item header decomposition: `bbbbttss`.
struct ItemHeader {
    tag: u8,
    item_type: u8,
    payload: [u8; 4],
    payload_len: usize,
}

#[derive(Default)]
pub struct HidParser {
    status_ok: bool,
    status_done: bool,
    reports: BTreeMap<(ReportKind, u8), Vec<MainItem>>,
    multiple_reports: bool,
    application_usage: Option<(u16, u16)>,
    /// Running total of bits declared so far, per `(kind, report_id)`,
    /// checked against [`MAX_REPORT_BITS`] as each Main item is emitted —
    /// tracked for every report kind, not just `Input`, so an
    /// oversize Output or Feature report is caught too.
    report_bits: BTreeMap<(ReportKind, u8), u32>,
}

const MAX_REPORT_BITS: u32 = u16::MAX as u32;

impl HidParser {
    pub fn new() -> Self {
        Self {
            status_ok: true,
            ..Default::default()
        }
    }

    pub fn status(&self) -> ParserStatus {
        if !self.status_ok {
            ParserStatus::Error
        } else if self.status_done {
            ParserStatus::Done
        } else {
            ParserStatus::Ok
        }
    }

    /// Consumes the descriptor, returning the final status.
    pub fn parse(&mut self, desc: &[u8]) -> ParserStatus {
        let mut global_stack: Vec<GlobalState> = Vec::new();
        let mut global = GlobalState::default();
        let mut local = LocalState::default();
        let mut collection_stack: Vec<CollectionType> = Vec::new();
        let mut first_application_seen = false;

        let mut i = 0usize;
        while i < desc.len() {
            let header = match Self::read_header(desc, &mut i) {
                Some(h) => h,
                None => return self.fail(),
            };
            let data = Self::payload_value(&header);
            let sdata = Self::payload_signed(&header);

            match header.item_type {
                0 => {
                    // Main
                    match header.tag {
                        8 | 9 | 11 => {
                            let kind = match header.tag {
                                8 => ReportKind::Input,
                                9 => ReportKind::Output,
                                _ => ReportKind::Feature,
                            };
                            if !self.emit_main_items(kind, data, &global, &local) {
                                return self.fail();
                            }
                            local = LocalState::default();
                        }
                        10 => {
                            let ctype = CollectionType::from_byte(data as u8);
                            if ctype == CollectionType::Application && !first_application_seen {
                                first_application_seen = true;
                                self.application_usage =
                                    Some((global.usage_page, local.usage_for_index(0)));
                            }
                            collection_stack.push(ctype);
                            local = LocalState::default();
                        }
                        12 => {
                            if collection_stack.pop().is_none() {
                                return self.fail();
                            }
                            local = LocalState::default();
                        }
                        _ => return self.fail(),
                    }
                }
                1 => {
                    // Global
                    match header.tag {
                        0 => global.usage_page = data as u16,
                        1 => global.logical_min = sdata,
                        2 => global.logical_max = sdata,
                        3 => global.physical_min = sdata,
                        4 => global.physical_max = sdata,
                        5 => global.unit_exponent = sdata,
                        6 => global.unit = data,
                        7 => global.report_size = data,
                        8 => {
                            global.report_id = data as u8;
                            self.multiple_reports = true;
                        }
                        9 => global.report_count = data,
                        10 => global_stack.push(global.clone()),
                        11 => match global_stack.pop() {
                            Some(g) => global = g,
                            None => return self.fail(),
                        },
                        _ => return self.fail(),
                    }
                }
                2 => {
                    // Local
                    match header.tag {
                        0 => local.usage_list.push(data as u16),
                        1 => local.usage_min = data as u16,
                        2 => local.usage_max = data as u16,
                        // Designator*/String*/Delimiter: accepted and ignored.
                        3..=10 => {}
                        _ => return self.fail(),
                    }
                }
                _ => return self.fail(),
            }
        }

        if !collection_stack.is_empty() {
            return self.fail();
        }

        self.status_done = true;
        ParserStatus::Done
    }

    fn fail(&mut self) -> ParserStatus {
        self.status_ok = false;
        ParserStatus::Error
    }

    fn emit_main_items(
        &mut self,
        kind: ReportKind,
        flags: u32,
        global: &GlobalState,
        local: &LocalState,
    ) -> bool {
        let key_id = if self.multiple_reports { global.report_id } else { 0 };
        let bits = match self
            .report_bits
            .entry((kind, key_id))
            .or_insert(0)
            .checked_add(global.report_size.saturating_mul(global.report_count))
        {
            Some(b) if b <= MAX_REPORT_BITS => b,
            _ => return false,
        };
        self.report_bits.insert((kind, key_id), bits);

        let items = self.reports.entry((kind, key_id)).or_default();
        for i in 0..global.report_count {
            items.push(MainItem {
                flags,
                usage_page: global.usage_page,
                usage: local.usage_for_index(i),
                logical_min: global.logical_min,
                logical_max: global.logical_max,
                report_size_bits: global.report_size,
                report_id: key_id,
            });
        }
        true
    }

    fn read_header(desc: &[u8], i: &mut usize) -> Option<ItemHeader> {
        let b = *desc.get(*i)?;
        *i += 1;
        if b == 0xFE {
            // Long item: size byte, tag byte, then that many payload bytes
            // (reserved; parsed and skipped, but byte accounting matters).
            let size = *desc.get(*i)? as usize;
            *i += 1;
            let _tag = *desc.get(*i)?;
            *i += 1;
            if *i + size > desc.len() {
                return None;
            }
            *i += size;
            // Represent as a no-op local item so the caller's match falls
            // through without emitting anything.
            return Some(ItemHeader {
                tag: 0xFF,
                item_type: 2,
                payload: [0; 4],
                payload_len: 0,
            });
        }

        let tag = (b >> 4) & 0xF;
        let item_type = (b >> 2) & 0x3;
        let size_code = b & 0x3;
        let payload_len = match size_code {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 4,
        };
        if *i + payload_len > desc.len() {
            return None;
        }
        let mut payload = [0u8; 4];
        payload[..payload_len].copy_from_slice(&desc[*i..*i + payload_len]);
        *i += payload_len;
        Some(ItemHeader {
            tag,
            item_type,
            payload,
            payload_len,
        })
    }

    fn payload_value(header: &ItemHeader) -> u32 {
        let mut v = 0u32;
        for k in 0..header.payload_len {
            v |= (header.payload[k] as u32) << (8 * k);
        }
        v
    }

    fn payload_signed(header: &ItemHeader) -> i32 {
        match header.payload_len {
            0 => 0,
            1 => header.payload[0] as i8 as i32,
            2 => i16::from_le_bytes([header.payload[0], header.payload[1]]) as i32,
            _ => i32::from_le_bytes(header.payload),
        }
    }

    /// For every non-Constant Input MainItem, invokes `cb(item)` in
    /// declaration order; stops early if `cb` returns false.
    pub fn enumerate_values<F: FnMut(&MainItem) -> bool>(&self, mut cb: F) {
        if self.status() != ParserStatus::Done {
            return;
        }
        for ((kind, _), items) in &self.reports {
            if *kind != ReportKind::Input {
                continue;
            }
            for item in items {
                if item.is_constant() {
                    continue;
                }
                if !cb(item) {
                    return;
                }
            }
        }
    }

    /// Decodes one inbound input report, invoking `cb(item, rawValue)` for
    /// every non-Constant item. LSB-first within each byte, bits crossing
    /// byte boundaries little-endian.
    pub fn scan_values<F: FnMut(&MainItem, u32)>(&self, report: &[u8], mut cb: F) {
        if self.status() != ParserStatus::Done {
            return;
        }

        let (report_id, body) = if self.multiple_reports {
            match report.split_first() {
                Some((id, rest)) => (*id, rest),
                None => return,
            }
        } else {
            (0, report)
        };

        let items = match self.reports.get(&(ReportKind::Input, report_id)) {
            Some(items) => items,
            None => return,
        };

        let mut reader = BitReader::new(body);
        for item in items {
            let value = match reader.read_bits(item.report_size_bits) {
                Some(v) => v,
                None => return,
            };
            if !item.is_constant() {
                cb(item, value);
            }
        }
    }

    /// Bytes needed to hold the largest input report: sum of per-item bits
    /// rounded up to a byte, plus one if multi-report.
    pub fn max_input_report_size(&self) -> usize {
        let max_bits = self
            .report_bits
            .iter()
            .filter(|((kind, _), _)| *kind == ReportKind::Input)
            .map(|(_, &bits)| bits)
            .max()
            .unwrap_or(0);
        let bytes = (max_bits as usize + 7) / 8;
        bytes + usize::from(self.multiple_reports)
    }

    /// (usagePage, usage) of the first Application-type Collection.
    pub fn application_usage(&self) -> Option<(u16, u16)> {
        self.application_usage
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Reads `n` bits, least-significant-bit first within each byte, with
    /// bits crossing byte boundaries little-endian.
    fn read_bits(&mut self, n: u32) -> Option<u32> {
        if self.bit_pos + n as usize > self.data.len() * 8 {
            return None;
        }
        let mut value: u32 = 0;
        for k in 0..n {
            let pos = self.bit_pos + k as usize;
            let byte = self.data[pos / 8];
            let bit = (byte >> (pos % 8)) & 1;
            value |= (bit as u32) << k;
        }
        self.bit_pos += n as usize;
        Some(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn application_usage_scenario() {
        // Usage Page Generic Desktop, Usage Game Pad, Collection Application, End Collection
        let desc = [0x05, 0x01, 0x09, 0x05, 0xA1, 0x01, 0xC0];
        let mut parser = HidParser::new();
        assert_eq!(parser.parse(&desc), ParserStatus::Done);
        assert_eq!(
            parser.application_usage(),
            Some((usage_page::GENERIC_DESKTOP, usage::GAME_PAD))
        );
    }

    #[test]
    fn enumerate_visits_non_constant_input_in_order() {
        // Generic Desktop / Gamepad application collection with 2 button
        // inputs (variable) and 1 padding bit (constant).
        let desc = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x05, // Usage (Game Pad)
            0xA1, 0x01, // Collection (Application)
            0x05, 0x09, // Usage Page (Button)
            0x19, 0x01, // Usage Minimum (1)
            0x29, 0x02, // Usage Maximum (2)
            0x15, 0x00, // Logical Minimum (0)
            0x25, 0x01, // Logical Maximum (1)
            0x75, 0x01, // Report Size (1)
            0x95, 0x02, // Report Count (2)
            0x81, 0x02, // Input (Data,Var,Abs)
            0x95, 0x01, // Report Count (1) padding
            0x81, 0x01, // Input (Const) -- skipped by enumerate_values
            0xC0, // End Collection
        ];
        let mut parser = HidParser::new();
        assert_eq!(parser.parse(&desc), ParserStatus::Done);
        let mut seen = Vec::new();
        parser.enumerate_values(|item| {
            seen.push(item.usage);
            true
        });
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn bitwise_decode_recovers_packed_fields() {
        // Pack three fields of sizes 3, 5, 8 into a 2-byte report and check
        // that scanning recovers them.
        let desc = build_descriptor(&[3, 5, 8]);
        let mut parser = HidParser::new();
        assert_eq!(parser.parse(&desc), ParserStatus::Done);

        let values = [0b101u32, 0b10110u32, 0xA5u32];
        let mut packed: u32 = 0;
        let mut shift = 0;
        for (v, size) in values.iter().zip([3u32, 5, 8]) {
            packed |= v << shift;
            shift += size;
        }
        let bytes = packed.to_le_bytes();
        let report = &bytes[..2];

        let mut decoded = Vec::new();
        parser.scan_values(report, |_item, value| decoded.push(value));
        assert_eq!(decoded, values.to_vec());
    }

    #[test]
    fn report_id_routing_selects_matching_table() {
        let desc = build_multi_report_descriptor();
        let mut parser = HidParser::new();
        assert_eq!(parser.parse(&desc), ParserStatus::Done);

        let mut seen_a = 0;
        parser.scan_values(&[0x01, 0xFF], |_, v| seen_a = v);
        assert_eq!(seen_a, 0xFF);

        let mut count_b = 0;
        parser.scan_values(&[0x02, 0xAB], |_, _| count_b += 1);
        assert_eq!(count_b, 1);
    }

    #[test]
    fn oversize_feature_report_fails_parse_even_with_no_input_items() {
        // Generic Desktop / Gamepad application collection whose only Main
        // item is a Feature field sized well past MAX_REPORT_BITS; an
        // Input-only overflow check would miss this entirely.
        let desc = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x05, // Usage (Game Pad)
            0xA1, 0x01, // Collection (Application)
            0x75, 0x02, // Report Size (2)
            0x96, 0xFF, 0xFF, // Report Count (65535)
            0xB1, 0x02, // Feature (Data,Var,Abs)
            0xC0, // End Collection
        ];
        let mut parser = HidParser::new();
        assert_eq!(parser.parse(&desc), ParserStatus::Error);
    }

    fn build_descriptor(sizes: &[u32]) -> Vec<u8> {
        let mut desc = vec![0x05, 0x01, 0x09, 0x05, 0xA1, 0x01];
        for &size in sizes {
            desc.extend_from_slice(&[0x75, size as u8]); // Report Size
            desc.extend_from_slice(&[0x95, 0x01]); // Report Count (1)
            desc.extend_from_slice(&[0x81, 0x02]); // Input (Data,Var,Abs)
        }
        desc.push(0xC0);
        desc
    }

    fn build_multi_report_descriptor() -> Vec<u8> {
        vec![
            0x05, 0x01, 0x09, 0x05, 0xA1, 0x01, // usage page/usage/collection
            0x85, 0x01, // Report ID 1
            0x75, 0x08, 0x95, 0x01, 0x81, 0x02, // 1 byte input field
            0x85, 0x02, // Report ID 2
            0x75, 0x08, 0x95, 0x01, 0x81, 0x02, // 1 byte input field
            0xC0,
        ]
    }
}
