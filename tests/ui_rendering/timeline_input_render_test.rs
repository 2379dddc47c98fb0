use anyhow::Result;
use climate_chat::cli::app::{ChatEvent, KeyOutcome};
use climate_chat::neighborhood::LocationHint;
use climate_chat::protocol::{APOLOGY, ChatEnvelope};
use climate_chat::session::transport::TransportError;

use crate::common::{
    input_snapshot, new_harness, press_ctrl_j, status_snapshot, submit_line, timeline_snapshot,
    type_text,
};

const WYNWOOD: LocationHint = LocationHint {
    lat: 25.8005,
    lon: -80.1995,
};

#[test]
fn initial_render_shows_welcome_and_status_with_session() -> Result<()> {
    let harness = new_harness("ui-welcome", 100, 24)?;

    let timeline = timeline_snapshot(&harness)?;
    assert!(timeline.contains("Ask about flood, heat or storm risk"));

    let status = status_snapshot(&harness)?;
    assert!(status.contains("Climate Chat | Session: ui-welcome"));
    assert!(status.contains("Server: http://127.0.0.1:3000"));
    assert!(status.ends_with("Ready"));

    Ok(())
}

#[test]
fn submitted_question_shows_thinking_until_reply_arrives() -> Result<()> {
    let mut harness = new_harness("ui-submit", 100, 24)?;

    let outcome = submit_line(&mut harness, "Heat in Wynwood?")?;
    let KeyOutcome::Submit(request) = outcome else {
        panic!("expected submit, got {outcome:?}");
    };
    assert_eq!(request.message, "Heat in Wynwood?");
    assert_eq!(request.session_id, "ui-submit");

    let timeline = timeline_snapshot(&harness)?;
    assert!(timeline.contains("You: Heat in Wynwood?"));
    assert!(timeline.contains("Thinking..."));
    assert!(status_snapshot(&harness)?.contains("Waiting for reply..."));
    assert!(!input_snapshot(&harness)?.contains("Wynwood"));

    Ok(())
}

#[test]
fn streamed_reply_renders_without_trailer() -> Result<()> {
    let mut harness = new_harness("ui-stream", 100, 24)?;
    submit_line(&mut harness, "Heat in Wynwood?")?;

    harness.apply(ChatEvent::Chunk("## Heat\n\nWynwood runs ".to_string()))?;
    let partial = timeline_snapshot(&harness)?;
    assert!(partial.contains("Wynwood runs"));
    assert!(!partial.contains("Thinking..."));

    let trailer = serde_json::to_string(&ChatEnvelope::new(
        "## Heat\n\nWynwood runs hot.",
        Some(WYNWOOD),
    ))?;
    harness.apply(ChatEvent::Chunk(format!("hot.\n{trailer}\n")))?;
    harness.apply(ChatEvent::Done)?;

    let timeline = timeline_snapshot(&harness)?;
    assert!(timeline.contains("Assistant:"));
    assert!(timeline.contains("Heat"));
    assert!(timeline.contains("Wynwood runs hot."));
    assert!(!timeline.contains("parsed"));
    assert!(!timeline.contains("## "));
    assert!(status_snapshot(&harness)?.ends_with("Ready"));

    Ok(())
}

#[test]
fn failed_reply_shows_apology_and_cause() -> Result<()> {
    let mut harness = new_harness("ui-failure", 100, 24)?;
    submit_line(&mut harness, "Brickell?")?;

    harness.apply(ChatEvent::Failed(TransportError::Status {
        status: 500,
        message: "Groq API key not set".to_string(),
    }))?;

    let timeline = timeline_snapshot(&harness)?;
    assert!(timeline.contains(APOLOGY));
    assert!(timeline.contains("server returned 500: Groq API key not set"));
    assert!(status_snapshot(&harness)?.ends_with("Ready"));

    Ok(())
}

#[test]
fn second_submit_while_waiting_keeps_draft() -> Result<()> {
    let mut harness = new_harness("ui-busy", 100, 24)?;
    submit_line(&mut harness, "First")?;

    let outcome = submit_line(&mut harness, "Second")?;
    assert_eq!(outcome, KeyOutcome::Continue);
    assert_eq!(harness.app.input(), "Second");
    assert!(timeline_snapshot(&harness)?.contains("Still waiting for the previous reply"));

    Ok(())
}

#[test]
fn multiline_input_scroll_keeps_latest_lines_visible() -> Result<()> {
    let mut harness = new_harness("ui-multiline", 100, 24)?;

    for line_no in 1..=8 {
        type_text(&mut harness, &format!("line-{line_no}"))?;
        if line_no < 8 {
            press_ctrl_j(&mut harness)?;
        }
    }

    assert!(harness.app.input().starts_with("line-1\nline-2\nline-3"));
    assert!(harness.app.input().ends_with("line-8"));

    let input = input_snapshot(&harness)?;
    assert!(!input.contains("line-1"));
    assert!(input.contains("line-8"));

    let regions = harness.regions()?;
    let last_content_row = regions.input.y + regions.input.height.saturating_sub(2);
    let last_row = harness.line(last_content_row).unwrap_or_default();
    assert!(last_row.contains("line-8"));

    Ok(())
}
