//! User-facing output for the CLI: colored summaries and JSON.

use std::io::{self, Write};

use termcolor::{Color, ColorSpec, WriteColor};

use crate::dns::{class_name, type_name, DnsMessage, DnsResourceRecord};

/// Writes a human-readable summary of `message`.
pub fn print_message(out: &mut impl WriteColor, message: &DnsMessage) -> io::Result<()> {
    let header = &message.header;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
    writeln!(
        out,
        "DNS {} {:#06x} (opcode {}, rcode {})",
        if header.qr { "response" } else { "query" },
        header.id,
        header.opcode,
        header.rcode
    )?;
    out.reset()?;

    let flags: Vec<&str> = [
        (header.aa, "aa"),
        (header.tc, "tc"),
        (header.rd, "rd"),
        (header.ra, "ra"),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .map(|(_, name)| *name)
    .collect();
    if !flags.is_empty() {
        writeln!(out, "flags: {}", flags.join(" "))?;
    }

    section(out, "questions", message.questions.len())?;
    for q in &message.questions {
        writeln!(out, "  {} {} {}", q.name, class_name(q.qclass), type_name(q.qtype))?;
    }
    records(out, "answers", &message.answers)?;
    records(out, "authority", &message.authority)?;
    records(out, "additional", &message.additional)?;
    Ok(())
}

/// Writes `message` as pretty-printed JSON.
pub fn print_json(out: &mut impl Write, message: &DnsMessage) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, message)?;
    writeln!(out)
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn section(out: &mut impl WriteColor, name: &str, count: usize) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    write!(out, "{}", name)?;
    out.reset()?;
    writeln!(out, ": {}", count)
}

fn records(out: &mut impl WriteColor, name: &str, rrs: &[DnsResourceRecord]) -> io::Result<()> {
    section(out, name, rrs.len())?;
    for rr in rrs {
        writeln!(
            out,
            "  {} {} {} ttl={} {}",
            rr.name,
            class_name(rr.class),
            type_name(rr.rtype),
            rr.ttl,
            rr.rdata
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{DnsHeader, DnsName, DnsQuestion, DnsRdata};
    use termcolor::NoColor;

    fn message() -> DnsMessage {
        DnsMessage {
            header: DnsHeader {
                id: 0x1234,
                qr: false,
                opcode: 0,
                aa: false,
                tc: false,
                rd: true,
                ra: false,
                rcode: 0,
                question_count: 1,
                answer_count: 0,
                authority_count: 0,
                additional_count: 0,
            },
            questions: vec![DnsQuestion {
                name: DnsName {
                    labels: vec!["example".into(), "com".into()],
                },
                qtype: 1,
                qclass: 1,
            }],
            answers: vec![],
            authority: vec![],
            additional: vec![],
        }
    }

    #[test]
    fn records_show_decoded_data() {
        let mut msg = message();
        msg.answers.push(DnsResourceRecord {
            name: DnsName {
                labels: vec!["example".into(), "com".into()],
            },
            rtype: 15,
            class: 1,
            ttl: 300,
            rdata: DnsRdata::Mx {
                preference: 10,
                exchange: DnsName {
                    labels: vec!["mx".into(), "example".into(), "com".into()],
                },
            },
        });
        let mut out = NoColor::new(Vec::new());
        print_message(&mut out, &msg).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert!(text.contains("answers: 1"));
        assert!(text.contains("example.com. IN MX ttl=300 10 mx.example.com."));
    }

    #[test]
    fn summary_lists_questions() {
        let mut out = NoColor::new(Vec::new());
        print_message(&mut out, &message()).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert!(text.starts_with("DNS query 0x1234"));
        assert!(text.contains("flags: rd"));
        assert!(text.contains("example.com. IN A"));
        assert!(text.contains("answers: 0"));
    }

    #[test]
    fn json_has_header_fields() {
        let mut out = Vec::new();
        print_json(&mut out, &message()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["header"]["id"], 0x1234);
        assert_eq!(json["questions"][0]["name"][1], "com");
    }
}
