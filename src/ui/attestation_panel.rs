//! Verification results overlay.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::domain::attestation::{AttestationPanelState, CheckOutcome, VerificationReport};

use super::styles;

/// Longest prefix of a quote or payload shown in the panel.
const EVIDENCE_PREVIEW_CHARS: usize = 48;

pub fn render_attestation_panel(frame: &mut Frame<'_>, area: Rect, panel: &AttestationPanelState) {
    let lines = match panel {
        AttestationPanelState::Hidden => return,
        AttestationPanelState::Loading { message_id } => vec![Line::from(Span::styled(
            format!("Verifying message {message_id}..."),
            styles::hint_style(),
        ))],
        AttestationPanelState::Ready(report) => styled_report_lines(report),
        AttestationPanelState::Error(error) => vec![Line::from(Span::styled(
            error.clone(),
            styles::message_error_style(),
        ))],
    };

    let area = centered_rect(70, 60, area);
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(styles::active_panel_border_style())
                .title(" Verification · esc to close "),
        );

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn styled_report_lines(report: &VerificationReport) -> Vec<Line<'static>> {
    let mut lines = vec![
        field_line("Message", report.message_id.clone()),
        field_line("Model", report.model.clone()),
        Line::default(),
        check_line("Signature", &report.signature_check),
        check_line("Response hash", &report.hash_binding),
        check_line("Enclave key", &report.enclave_binding),
        Line::default(),
    ];

    for (label, value) in evidence_fields(report) {
        lines.push(field_line(label, value));
    }

    lines.push(Line::default());
    lines.push(verdict_line(report));
    lines
}

fn field_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<14}"), styles::field_label_style()),
        Span::styled(value, styles::message_text_style()),
    ])
}

fn check_line(label: &str, outcome: &CheckOutcome) -> Line<'static> {
    let style = styles::check_style(outcome);
    let mut spans = vec![
        Span::styled(format!("{} ", outcome.symbol()), style),
        Span::styled(format!("{label:<14}"), styles::field_label_style()),
    ];
    if let Some(detail) = outcome.detail() {
        spans.push(Span::styled(detail.to_owned(), style));
    }
    Line::from(spans)
}

fn verdict_line(report: &VerificationReport) -> Line<'static> {
    if report.is_trusted() {
        Line::from(Span::styled(
            "Trusted: response was signed inside the attested enclave".to_owned(),
            styles::check_style(&CheckOutcome::Passed),
        ))
    } else {
        Line::from(Span::styled(
            "Not trusted".to_owned(),
            styles::check_style(&CheckOutcome::Failed(String::new())),
        ))
    }
}

fn evidence_fields(report: &VerificationReport) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();

    if let Some(signature) = &report.signature {
        fields.push(("Signer", signature.signing_address.clone()));
        fields.push(("Algorithm", signature.signing_algo.clone()));
        if let Some((request, response)) = signature.signed_hashes() {
            fields.push(("Request hash", request.to_owned()));
            fields.push(("Response hash", response.to_owned()));
        }
    }

    if let Some(attestation) = &report.report {
        fields.push(("Enclave key", attestation.signing_address.clone()));
        if let Some(quote) = &attestation.intel_quote {
            fields.push(("Intel quote", preview(quote)));
        }
        if let Some(payload) = &attestation.nvidia_payload {
            fields.push(("NVIDIA", preview(payload)));
        }
    }

    fields
}

fn preview(value: &str) -> String {
    if value.chars().count() <= EVIDENCE_PREVIEW_CHARS {
        return value.to_owned();
    }
    let head: String = value.chars().take(EVIDENCE_PREVIEW_CHARS).collect();
    format!("{head}… ({} chars)", value.chars().count())
}

/// Plain-text rendering of a verification report for terminal output.
pub fn report_lines(report: &VerificationReport) -> Vec<String> {
    styled_report_lines(report)
        .into_iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
                .trim_end()
                .to_owned()
        })
        .collect()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attestation::{AttestationReport, MessageSignature};

    fn report() -> VerificationReport {
        VerificationReport {
            message_id: "a1".to_owned(),
            model: "llama".to_owned(),
            signature: Some(MessageSignature {
                text: "req:resp".to_owned(),
                signature: "0x00".to_owned(),
                signing_address: "0xabc".to_owned(),
                signing_algo: "ecdsa".to_owned(),
            }),
            signature_check: CheckOutcome::Passed,
            hash_binding: CheckOutcome::Skipped("content unavailable".to_owned()),
            report: Some(AttestationReport {
                model: Some("llama".to_owned()),
                signing_address: "0xabc".to_owned(),
                signing_algo: "ecdsa".to_owned(),
                intel_quote: Some("f".repeat(100)),
                nvidia_payload: None,
                raw: "{}".to_owned(),
            }),
            enclave_binding: CheckOutcome::Passed,
        }
    }

    #[test]
    fn report_lines_list_checks_and_verdict() {
        let lines = report_lines(&report());

        assert!(lines.contains(&"✓ Signature".to_owned()));
        assert!(lines.contains(&"- Response hash content unavailable".to_owned()));
        assert!(lines.contains(&"Signer        0xabc".to_owned()));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("Trusted: response was signed inside the attested enclave")
        );
    }

    #[test]
    fn failed_enclave_binding_is_not_trusted() {
        let mut report = report();
        report.enclave_binding = CheckOutcome::Failed("address mismatch".to_owned());

        let lines = report_lines(&report);

        assert!(lines.contains(&"✗ Enclave key   address mismatch".to_owned()));
        assert_eq!(lines.last().map(String::as_str), Some("Not trusted"));
    }

    #[test]
    fn long_quotes_are_truncated() {
        let lines = report_lines(&report());

        let quote = lines
            .iter()
            .find(|line| line.starts_with("Intel quote"))
            .expect("quote line");
        assert!(quote.ends_with("… (100 chars)"));
    }

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 100, 40);

        let inner = centered_rect(70, 60, area);

        assert_eq!(inner.width, 70);
        assert_eq!(inner.height, 24);
        assert_eq!(inner.x, 15);
    }
}
