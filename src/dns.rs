//! A DNS message grammar (RFC 1035 wire format, without name compression).
//!
//! The header is described bit by bit, names with length-prefixed labels and
//! resource data with a 16-bit length window. Actions turn the matched pieces
//! into the typed [`DnsMessage`].
//!
//! Sections are not delimited on the wire: a question can also read as the
//! start of a resource record. The header counts decide how many entries each
//! section holds, so the message is read entry by entry, each with the parser
//! for its section, and must end exactly after the last one.
//!
//! Resource data is parsed by record type inside its length window. Data that
//! does not fit its type's layout is kept as [`DnsRdata::Unparsed`].
//!
//! ```rust
//! use bitpeg::dns::DnsParser;
//!
//! let packet = [
//!     0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00,
//!     0x00, 0x01, 0x00, 0x01,
//! ];
//! let parser = DnsParser::new().unwrap();
//! let message = parser.parse(&packet).unwrap();
//! assert_eq!(message.header.id, 0x1234);
//! assert_eq!(message.questions[0].name.to_string(), "example.com.");
//! ```

use std::fmt;
use std::net::Ipv4Addr;

use log::debug;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::actions;
use crate::config::EngineConfig;
use crate::errors::{CallbackError, GrammarError, MatchError};
use crate::grammar::{Grammar, GrammarBuilder, ParserId};
use crate::input::Cursor;
use crate::value::Value;

// ============================================================================
// MESSAGE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsHeader {
    pub id: u16,
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub rcode: u8,
    pub question_count: u16,
    pub answer_count: u16,
    pub authority_count: u16,
    pub additional_count: u16,
}

/// A domain name as its sequence of labels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct DnsName {
    pub labels: Vec<String>,
}

impl fmt::Display for DnsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_str(".");
        }
        for label in &self.labels {
            write!(f, "{}.", label)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsQuestion {
    pub name: DnsName,
    pub qtype: u16,
    pub qclass: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsSoa {
    pub mname: DnsName,
    pub rname: DnsName,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

/// Resource data, decoded according to the record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DnsRdata {
    A(Ipv4Addr),
    /// NS, MD, MF, CNAME, MB, MG, MR and PTR all carry one domain name.
    Name(DnsName),
    Soa(DnsSoa),
    Null(Vec<u8>),
    Wks {
        address: Ipv4Addr,
        protocol: u8,
        bitmap: Vec<u8>,
    },
    Hinfo {
        cpu: String,
        os: String,
    },
    Minfo {
        rmailbx: DnsName,
        emailbx: DnsName,
    },
    Mx {
        preference: u16,
        exchange: DnsName,
    },
    Txt(Vec<String>),
    /// Data that does not match the layout of its record type.
    Unparsed(Vec<u8>),
}

impl fmt::Display for DnsRdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsRdata::A(addr) => write!(f, "{}", addr),
            DnsRdata::Name(name) => write!(f, "{}", name),
            DnsRdata::Soa(soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum
            ),
            DnsRdata::Null(bytes) | DnsRdata::Unparsed(bytes) => f.write_str(&hex(bytes)),
            DnsRdata::Wks {
                address,
                protocol,
                bitmap,
            } => write!(f, "{} {} {}", address, protocol, hex(bitmap)),
            DnsRdata::Hinfo { cpu, os } => write!(f, "{:?} {:?}", cpu, os),
            DnsRdata::Minfo { rmailbx, emailbx } => write!(f, "{} {}", rmailbx, emailbx),
            DnsRdata::Mx {
                preference,
                exchange,
            } => write!(f, "{} {}", preference, exchange),
            DnsRdata::Txt(strings) => {
                let quoted: Vec<String> = strings.iter().map(|s| format!("{:?}", s)).collect();
                f.write_str(&quoted.join(" "))
            }
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsResourceRecord {
    pub name: DnsName,
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    pub rdata: DnsRdata,
}

impl DnsResourceRecord {
    /// The IPv4 address carried by an `A` record.
    pub fn address(&self) -> Option<Ipv4Addr> {
        match self.rdata {
            DnsRdata::A(addr) => Some(addr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsMessage {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsResourceRecord>,
    pub authority: Vec<DnsResourceRecord>,
    pub additional: Vec<DnsResourceRecord>,
}

const TYPE_NAMES: [&str; 17] = [
    "nil", "A", "NS", "MD", "MF", "CNAME", "SOA", "MB", "MG", "MR", "NULL", "WKS", "PTR",
    "HINFO", "MINFO", "MX", "TXT",
];

const CLASS_NAMES: [&str; 5] = ["nil", "IN", "CS", "CH", "HS"];

/// Mnemonic for a TYPE or QTYPE value.
pub fn type_name(qtype: u16) -> &'static str {
    match qtype {
        252 => "AXFR",
        253 => "MAILB",
        254 => "MAILA",
        255 => "*",
        t => TYPE_NAMES.get(usize::from(t)).copied().unwrap_or("?"),
    }
}

/// Mnemonic for a CLASS or QCLASS value.
pub fn class_name(qclass: u16) -> &'static str {
    match qclass {
        255 => "*",
        c => CLASS_NAMES.get(usize::from(c)).copied().unwrap_or("?"),
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, Diagnostic)]
pub enum DnsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Match(#[from] MatchError),

    #[error("{extra} bytes after the last record, at byte {offset}")]
    #[diagnostic(
        code(bitpeg::dns::trailing_bytes),
        help("the header counts cover fewer entries than the message holds")
    )]
    TrailingBytes { offset: usize, extra: usize },

    #[error("DNS grammar produced a {found} value")]
    #[diagnostic(code(bitpeg::dns::unexpected_value))]
    UnexpectedValue { found: &'static str },
}

// ============================================================================
// PARSER
// ============================================================================

/// The DNS message grammar, built once and reusable across packets and threads.
#[derive(Debug)]
pub struct DnsParser {
    grammar: Grammar,
    header: ParserId,
    question: ParserId,
    record: ParserId,
}

impl DnsParser {
    pub fn new() -> Result<Self, GrammarError> {
        let mut g = GrammarBuilder::new();

        let id = g.bits(16, false)?;
        let qr = g.bits(1, false)?;
        let opcode = g.bits(4, false)?;
        let aa = g.bits(1, false)?;
        let tc = g.bits(1, false)?;
        let rd = g.bits(1, false)?;
        let ra = g.bits(1, false)?;
        let z = g.bits(3, false)?;
        let z = g.attr_bool(z, |v| Ok(v.as_u64() == Some(0)))?;
        let hdzero = g.ignore(z)?;
        let rcode = g.bits(4, false)?;
        let qdcount = g.uint16();
        let ancount = g.uint16();
        let nscount = g.uint16();
        let arcount = g.uint16();
        let header = g.sequence(&[
            id, qr, opcode, aa, tc, rd, ra, hdzero, rcode, qdcount, ancount, nscount, arcount,
        ])?;
        let header = g.action(header, act_header)?;

        let octet = g.uint8();
        let word = g.uint16();
        let long = g.uint32();

        let rtype = g.int_range(word, 1, 16)?;
        let meta_type = g.int_range(word, 252, 255)?;
        let qtype = g.choice(&[rtype, meta_type])?;
        let class = g.int_range(word, 1, 4)?;
        let any_class = g.int_range(word, 255, 255)?;
        let qclass = g.choice(&[class, any_class])?;

        let octets = g.many(octet)?;
        let bytes = g.action(octets, actions::to_bytes())?;
        let label_len = g.int_range(octet, 1, 63)?;
        let label = g.length_value(label_len, octets)?;
        let label = g.action(label, actions::to_bytes())?;
        let root = g.ch(0);

        let labels1 = g.many1(label)?;
        let qname = g.sequence(&[labels1, root])?;
        let qname = g.action(qname, act_name)?;
        let labels = g.many(label)?;
        let domain = g.sequence(&[labels, root])?;
        let domain = g.action(domain, act_name)?;

        let question = g.sequence(&[qname, qtype, qclass])?;
        let question = g.action(question, act_question)?;

        // <character-string>: a length octet followed by that many bytes.
        let text = g.length_value(octet, octets)?;
        let text = g.action(text, actions::to_bytes())?;

        let a = g.action(long, act_a)?;
        let name = g.action(domain, act_name_rdata)?;
        let soa = g.sequence(&[domain, domain, long, long, long, long, long])?;
        let soa = g.action(soa, act_soa)?;
        let null = g.action(bytes, |v| Ok(Value::user(DnsRdata::Null(byte_field(v)?))))?;
        let wks = g.sequence(&[long, octet, bytes])?;
        let wks = g.action(wks, act_wks)?;
        let hinfo = g.sequence(&[text, text])?;
        let hinfo = g.action(hinfo, act_hinfo)?;
        let minfo = g.sequence(&[domain, domain])?;
        let minfo = g.action(minfo, act_minfo)?;
        let mx = g.sequence(&[word, domain])?;
        let mx = g.action(mx, act_mx)?;
        let txt = g.many1(text)?;
        let txt = g.action(txt, act_txt)?;
        let unparsed = g.action(bytes, |v| Ok(Value::user(DnsRdata::Unparsed(byte_field(v)?))))?;

        let name_types = [
            g.int_range(word, 2, 5)?,
            g.int_range(word, 7, 9)?,
            g.int_range(word, 12, 12)?,
        ];
        let name_types = g.choice(&name_types)?;
        let layouts = [
            (g.int_range(word, 1, 1)?, a),
            (name_types, name),
            (g.int_range(word, 6, 6)?, soa),
            (g.int_range(word, 10, 10)?, null),
            (g.int_range(word, 11, 11)?, wks),
            (g.int_range(word, 13, 13)?, hinfo),
            (g.int_range(word, 14, 14)?, minfo),
            (g.int_range(word, 15, 15)?, mx),
            (g.int_range(word, 16, 16)?, txt),
            // Any known type whose data did not fit its layout.
            (rtype, unparsed),
        ];
        let mut records = Vec::with_capacity(layouts.len());
        for (typ, rdata) in layouts {
            let rdata = g.length_value(word, rdata)?;
            records.push(g.sequence(&[domain, typ, class, long, rdata])?);
        }
        let record = g.choice(&records)?;
        let record = g.action(record, act_rr)?;

        Ok(Self {
            grammar: g.finish()?,
            header,
            question,
            record,
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The parser for the 12-byte header.
    pub fn header(&self) -> ParserId {
        self.header
    }

    /// The parser for one question entry.
    pub fn question(&self) -> ParserId {
        self.question
    }

    /// The parser for one resource record.
    pub fn record(&self) -> ParserId {
        self.record
    }

    pub fn parse(&self, packet: &[u8]) -> Result<DnsMessage, DnsError> {
        self.parse_with(packet, EngineConfig::default())
    }

    pub fn parse_with(&self, packet: &[u8], config: EngineConfig) -> Result<DnsMessage, DnsError> {
        let mut entries = Entries {
            grammar: &self.grammar,
            packet,
            offset: 0,
            config,
        };
        let header: DnsHeader = entries.next(self.header)?;
        let questions = entries.take(self.question, header.question_count)?;
        let answers = entries.take(self.record, header.answer_count)?;
        let authority = entries.take(self.record, header.authority_count)?;
        let additional = entries.take(self.record, header.additional_count)?;

        if entries.offset < packet.len() {
            return Err(DnsError::TrailingBytes {
                offset: entries.offset,
                extra: packet.len() - entries.offset,
            });
        }
        debug!(
            "dns message {:#06x}: {} questions, {} records",
            header.id,
            questions.len(),
            answers.len() + authority.len() + additional.len()
        );
        Ok(DnsMessage {
            header,
            questions,
            answers,
            authority,
            additional,
        })
    }
}

/// Reads consecutive entries of a packet, each with its own run.
struct Entries<'a> {
    grammar: &'a Grammar,
    packet: &'a [u8],
    offset: usize,
    config: EngineConfig,
}

impl Entries<'_> {
    fn next<T: Clone + 'static>(&mut self, parser: ParserId) -> Result<T, DnsError> {
        let rest = self.packet.get(self.offset..).unwrap_or_default();
        let offset = self.offset;
        let success = self
            .grammar
            .parse_with(parser, rest, self.config)?
            .into_result()
            .map_err(|err| relocate(err, offset))?;
        self.offset += success.bytes_consumed();
        success
            .value
            .as_user::<T>()
            .cloned()
            .ok_or(DnsError::UnexpectedValue {
                found: success.value.type_name(),
            })
    }

    fn take<T: Clone + 'static>(&mut self, parser: ParserId, count: u16) -> Result<Vec<T>, DnsError> {
        (0..count).map(|_| self.next(parser)).collect()
    }
}

/// Moves failure positions from entry-relative to packet-relative.
fn relocate(err: MatchError, offset: usize) -> MatchError {
    let shift = |c: Cursor| c.advance_bytes(offset).unwrap_or(c);
    MatchError {
        position: shift(err.position),
        deepest: shift(err.deepest),
        ..err
    }
}

// ============================================================================
// ACTIONS
// ============================================================================

fn field(fields: &[Value], index: usize) -> Result<&Value, CallbackError> {
    fields
        .get(index)
        .ok_or_else(|| CallbackError::new(format!("missing field {}", index)))
}

fn uint_field<T: TryFrom<u64>>(fields: &[Value], index: usize) -> Result<T, CallbackError> {
    field(fields, index)?
        .as_u64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| CallbackError::new(format!("field {} is not an integer in range", index)))
}

fn user_field<T: Clone + 'static>(fields: &[Value], index: usize) -> Result<T, CallbackError> {
    let value = field(fields, index)?;
    value.as_user::<T>().cloned().ok_or_else(|| {
        CallbackError::new(format!("field {} is a {} value", index, value.type_name()))
    })
}

fn byte_field(value: &Value) -> Result<Vec<u8>, CallbackError> {
    value
        .as_bytes()
        .map(<[u8]>::to_vec)
        .ok_or_else(|| CallbackError::new(format!("expected bytes, got {}", value.type_name())))
}

fn text_field(fields: &[Value], index: usize) -> Result<String, CallbackError> {
    let bytes = byte_field(field(fields, index)?)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn sequence(value: &Value) -> Result<&[Value], CallbackError> {
    value
        .as_sequence()
        .ok_or_else(|| CallbackError::new(format!("expected a sequence, got {}", value.type_name())))
}

fn act_header(value: &Value) -> Result<Value, CallbackError> {
    let f = sequence(value)?;
    let flag = |i| uint_field::<u8>(f, i).map(|b| b != 0);
    Ok(Value::user(DnsHeader {
        id: uint_field(f, 0)?,
        qr: flag(1)?,
        opcode: uint_field(f, 2)?,
        aa: flag(3)?,
        tc: flag(4)?,
        rd: flag(5)?,
        ra: flag(6)?,
        rcode: uint_field(f, 7)?,
        question_count: uint_field(f, 8)?,
        answer_count: uint_field(f, 9)?,
        authority_count: uint_field(f, 10)?,
        additional_count: uint_field(f, 11)?,
    }))
}

/// `[[label bytes...], 0]` to a [`DnsName`].
fn act_name(value: &Value) -> Result<Value, CallbackError> {
    let labels = sequence(field(sequence(value)?, 0)?)?
        .iter()
        .map(|label| byte_field(label).map(|b| String::from_utf8_lossy(&b).into_owned()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::user(DnsName { labels }))
}

fn act_question(value: &Value) -> Result<Value, CallbackError> {
    let f = sequence(value)?;
    Ok(Value::user(DnsQuestion {
        name: user_field(f, 0)?,
        qtype: uint_field(f, 1)?,
        qclass: uint_field(f, 2)?,
    }))
}

fn act_a(value: &Value) -> Result<Value, CallbackError> {
    let addr = uint_field::<u32>(std::slice::from_ref(value), 0)?;
    Ok(Value::user(DnsRdata::A(Ipv4Addr::from(addr))))
}

fn act_name_rdata(value: &Value) -> Result<Value, CallbackError> {
    let name = user_field(std::slice::from_ref(value), 0)?;
    Ok(Value::user(DnsRdata::Name(name)))
}

fn act_soa(value: &Value) -> Result<Value, CallbackError> {
    let f = sequence(value)?;
    Ok(Value::user(DnsRdata::Soa(DnsSoa {
        mname: user_field(f, 0)?,
        rname: user_field(f, 1)?,
        serial: uint_field(f, 2)?,
        refresh: uint_field(f, 3)?,
        retry: uint_field(f, 4)?,
        expire: uint_field(f, 5)?,
        minimum: uint_field(f, 6)?,
    })))
}

fn act_wks(value: &Value) -> Result<Value, CallbackError> {
    let f = sequence(value)?;
    Ok(Value::user(DnsRdata::Wks {
        address: Ipv4Addr::from(uint_field::<u32>(f, 0)?),
        protocol: uint_field(f, 1)?,
        bitmap: byte_field(field(f, 2)?)?,
    }))
}

fn act_hinfo(value: &Value) -> Result<Value, CallbackError> {
    let f = sequence(value)?;
    Ok(Value::user(DnsRdata::Hinfo {
        cpu: text_field(f, 0)?,
        os: text_field(f, 1)?,
    }))
}

fn act_minfo(value: &Value) -> Result<Value, CallbackError> {
    let f = sequence(value)?;
    Ok(Value::user(DnsRdata::Minfo {
        rmailbx: user_field(f, 0)?,
        emailbx: user_field(f, 1)?,
    }))
}

fn act_mx(value: &Value) -> Result<Value, CallbackError> {
    let f = sequence(value)?;
    Ok(Value::user(DnsRdata::Mx {
        preference: uint_field(f, 0)?,
        exchange: user_field(f, 1)?,
    }))
}

fn act_txt(value: &Value) -> Result<Value, CallbackError> {
    let f = sequence(value)?;
    let strings = (0..f.len()).map(|i| text_field(f, i)).collect::<Result<_, _>>()?;
    Ok(Value::user(DnsRdata::Txt(strings)))
}

fn act_rr(value: &Value) -> Result<Value, CallbackError> {
    let f = sequence(value)?;
    Ok(Value::user(DnsResourceRecord {
        name: user_field(f, 0)?,
        rtype: uint_field(f, 1)?,
        class: uint_field(f, 2)?,
        ttl: uint_field(f, 3)?,
        rdata: user_field(f, 4)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_render_with_trailing_dot() {
        let name = DnsName {
            labels: vec!["www".into(), "example".into(), "org".into()],
        };
        assert_eq!(name.to_string(), "www.example.org.");
        assert_eq!(DnsName::default().to_string(), ".");
    }

    #[test]
    fn mnemonics() {
        assert_eq!(type_name(1), "A");
        assert_eq!(type_name(16), "TXT");
        assert_eq!(type_name(255), "*");
        assert_eq!(type_name(99), "?");
        assert_eq!(class_name(1), "IN");
        assert_eq!(class_name(255), "*");
    }

    #[test]
    fn rdata_renders_per_type() {
        let exchange = DnsName {
            labels: vec!["mail".into(), "example".into()],
        };
        assert_eq!(
            DnsRdata::Mx {
                preference: 10,
                exchange
            }
            .to_string(),
            "10 mail.example."
        );
        assert_eq!(DnsRdata::Txt(vec!["v=spf1".into(), "-all".into()]).to_string(), "\"v=spf1\" \"-all\"");
        assert_eq!(DnsRdata::Unparsed(vec![0xde, 0xad]).to_string(), "dead");
        assert_eq!(DnsRdata::A(Ipv4Addr::new(192, 0, 2, 1)).to_string(), "192.0.2.1");
    }

    #[test]
    fn relocated_failures_point_into_the_packet() {
        let err = MatchError {
            kind: crate::FailureKind::NoMatch,
            position: Cursor::at_byte(2),
            deepest: Cursor::new(3, 4),
        };
        let moved = relocate(err, 12);
        assert_eq!(moved.position, Cursor::at_byte(14));
        assert_eq!(moved.deepest, Cursor::new(15, 4));
    }
}
