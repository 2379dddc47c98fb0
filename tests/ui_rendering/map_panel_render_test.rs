use anyhow::Result;
use climate_chat::cli::app::ChatEvent;
use climate_chat::neighborhood::LocationHint;
use climate_chat::protocol::ChatEnvelope;

use crate::common::{map_snapshot, new_harness, submit_line};

#[test]
fn map_starts_on_downtown_miami_without_marker() -> Result<()> {
    let harness = new_harness("ui-map", 100, 24)?;

    let map = map_snapshot(&harness)?;
    assert!(map.contains("Center 25.7617, -80.1918"));
    assert!(map.contains("Zoom 11"));
    assert!(map.contains("No neighborhood selected"));

    Ok(())
}

#[test]
fn located_reply_moves_map_and_drops_marker() -> Result<()> {
    let mut harness = new_harness("ui-map-focus", 100, 24)?;
    submit_line(&mut harness, "Surge on Miami Beach?")?;

    harness.apply(ChatEvent::Envelope(ChatEnvelope::new(
        "Miami Beach sees the highest surge.",
        Some(LocationHint {
            lat: 25.7907,
            lon: -80.13,
        }),
    )))?;

    let map = map_snapshot(&harness)?;
    assert!(map.contains("Center 25.7907, -80.1300"));
    assert!(map.contains("Zoom 14"));
    assert!(map.contains("Surge on Miami Beach?"));
    assert!(!map.contains("No neighborhood selected"));

    Ok(())
}

#[test]
fn reply_without_location_leaves_map_alone() -> Result<()> {
    let mut harness = new_harness("ui-map-none", 100, 24)?;
    submit_line(&mut harness, "What is king tide flooding?")?;

    harness.apply(ChatEvent::Envelope(ChatEnvelope::new(
        "Seasonal high tides that flood low streets.",
        None,
    )))?;

    let map = map_snapshot(&harness)?;
    assert!(map.contains("Center 25.7617, -80.1918"));
    assert!(map.contains("No neighborhood selected"));

    Ok(())
}
