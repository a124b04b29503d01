use serde::{Deserialize, Serialize};

use crate::{viseme::Viseme, BlendShape, Result, WeightMap};

/// Fixed-step clock used to drive a scene without a renderer.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    pub elapsed_seconds: f32,
    pub frame: u64,
}

impl FrameClock {
    pub fn reset(&mut self) {
        self.elapsed_seconds = 0.0;
        self.frame = 0;
    }

    /// Advances by `delta` seconds and returns the new elapsed time.
    pub fn advance(&mut self, delta: f32) -> f32 {
        self.elapsed_seconds = (self.elapsed_seconds + delta).max(0.0);
        self.frame += 1;
        self.elapsed_seconds
    }
}

/// A viseme becoming active at `time` seconds of audio playback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisemeEvent {
    pub time: f32,
    /// Wire id, see [`Viseme::from_id`].
    pub viseme: i32,
}

impl VisemeEvent {
    pub fn new(time: f32, viseme: i32) -> Self {
        Self { time, viseme }
    }

    pub fn resolved(&self) -> Viseme {
        Viseme::from_id_or_silence(self.viseme)
    }
}

/// The lip-sync track of one utterance, ordered by time.
///
/// Ordering is the producer's responsibility and is not checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisemeTrack {
    events: Vec<VisemeEvent>,
}

impl VisemeTrack {
    pub fn new(events: Vec<VisemeEvent>) -> Self {
        Self { events }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a JSON array of `{ "time", "viseme" }` objects.
    pub fn try_from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Like [`VisemeTrack::try_from_json`], but malformed input yields an
    /// empty track so the face falls back to idle motion.
    pub fn from_json(json: &str) -> Self {
        match Self::try_from_json(json) {
            Ok(track) => track,
            Err(err) => {
                tracing::warn!(%err, "discarding malformed viseme track");
                Self::empty()
            }
        }
    }

    pub fn events(&self) -> &[VisemeEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn active_at(&self, time: f32) -> Option<&VisemeEvent> {
        select_active_viseme(&self.events, time)
    }
}

impl From<Vec<VisemeEvent>> for VisemeTrack {
    fn from(events: Vec<VisemeEvent>) -> Self {
        Self::new(events)
    }
}

/// Returns the last event at or before `current_time`.
///
/// Before the first event (pre-roll) the first event is returned. `None` only
/// for an empty slice.
pub fn select_active_viseme(events: &[VisemeEvent], current_time: f32) -> Option<&VisemeEvent> {
    events
        .iter()
        .rev()
        .find(|event| event.time <= current_time)
        .or_else(|| events.first())
}

/// Writes lip-sync targets from the active viseme of a track.
#[derive(Debug, Clone)]
pub struct LipSyncDriver {
    intensity: f32,
}

impl LipSyncDriver {
    pub fn new(intensity: f32) -> Self {
        Self { intensity }
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Updates viseme and jaw targets for `audio_time`.
    ///
    /// Returns the applied viseme, or `None` when the track is empty and the
    /// targets were left alone.
    pub fn update(
        &self,
        track: &VisemeTrack,
        audio_time: f32,
        targets: &mut WeightMap,
    ) -> Option<Viseme> {
        let event = track.active_at(audio_time)?;
        let viseme = event.resolved();
        self.apply_viseme(viseme, targets);
        Some(viseme)
    }

    /// Every contributing shape gets the same intensity; the table weights
    /// only select which shapes move.
    pub fn apply_viseme(&self, viseme: Viseme, targets: &mut WeightMap) {
        targets.clear_visemes();
        for (shape, _) in viseme.contributions() {
            targets.set(*shape, self.intensity);
        }
        targets.set(
            BlendShape::JawOpen,
            viseme.jaw_open_amount() * self.intensity,
        );
    }

    /// Snaps every lip-sync target (visemes and jaw) to zero.
    pub fn reset(targets: &mut WeightMap) {
        targets.clear_visemes();
        targets.set(BlendShape::JawOpen, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events() -> Vec<VisemeEvent> {
        vec![
            VisemeEvent::new(0.0, 2),
            VisemeEvent::new(1.0, 5),
            VisemeEvent::new(2.0, 8),
        ]
    }

    #[test]
    fn selects_most_recent_event() {
        let events = events();

        assert_eq!(
            select_active_viseme(&events, 1.5),
            Some(&VisemeEvent::new(1.0, 5))
        );
        assert_eq!(
            select_active_viseme(&events, 2.0),
            Some(&VisemeEvent::new(2.0, 8))
        );
        assert_eq!(
            select_active_viseme(&events, 10.0),
            Some(&VisemeEvent::new(2.0, 8))
        );
    }

    #[test]
    fn pre_roll_falls_back_to_first_event() {
        let events = vec![VisemeEvent::new(1.0, 5)];
        assert_eq!(
            select_active_viseme(&events, 0.0),
            Some(&VisemeEvent::new(1.0, 5))
        );
    }

    #[test]
    fn empty_track_leaves_targets_untouched() {
        let driver = LipSyncDriver::new(0.5);
        let mut targets = WeightMap::new();
        targets.set(BlendShape::VisemeO, 0.4);
        targets.set(BlendShape::JawOpen, 0.2);
        let before = targets.clone();

        assert!(driver
            .update(&VisemeTrack::empty(), 3.0, &mut targets)
            .is_none());
        assert_eq!(targets, before);
    }

    #[test]
    fn contributions_are_a_presence_mask() {
        let driver = LipSyncDriver::new(0.5);
        let mut targets = WeightMap::new();
        targets.set(BlendShape::VisemeSil, 0.5);

        // ɔ: aa 0.6 + O 0.4, both receive the full intensity
        driver.apply_viseme(Viseme::Ao, &mut targets);

        assert_eq!(targets.get(BlendShape::VisemeAA), 0.5);
        assert_eq!(targets.get(BlendShape::VisemeO), 0.5);
        assert_eq!(targets.get(BlendShape::VisemeSil), 0.0);
        assert_eq!(
            targets.get(BlendShape::JawOpen),
            Viseme::Ao.jaw_open_amount() * 0.5
        );
    }

    #[test]
    fn unknown_wire_id_drives_silence() {
        let driver = LipSyncDriver::new(0.5);
        let track = VisemeTrack::new(vec![VisemeEvent::new(0.0, 99)]);
        let mut targets = WeightMap::new();

        assert_eq!(
            driver.update(&track, 0.5, &mut targets),
            Some(Viseme::Silence)
        );
        assert_eq!(targets.get(BlendShape::VisemeSil), 0.5);
        assert_eq!(targets.get(BlendShape::JawOpen), 0.0);
    }

    #[test]
    fn reset_clears_visemes_and_jaw_only() {
        let mut targets = WeightMap::new();
        targets.set(BlendShape::VisemeAA, 0.5);
        targets.set(BlendShape::JawOpen, 0.3);
        targets.set(BlendShape::MouthSmileLeft, 0.2);

        LipSyncDriver::reset(&mut targets);

        assert_eq!(targets.get(BlendShape::VisemeAA), 0.0);
        assert_eq!(targets.get(BlendShape::JawOpen), 0.0);
        assert_eq!(targets.get(BlendShape::MouthSmileLeft), 0.2);
    }

    #[test]
    fn parses_tracks_from_json() {
        let track =
            VisemeTrack::from_json(r#"[{"time": 0.0, "viseme": 0}, {"time": 0.2, "viseme": 2}]"#);
        assert_eq!(track.len(), 2);
        assert_eq!(track.events()[1], VisemeEvent::new(0.2, 2));
    }

    #[test]
    fn malformed_json_becomes_empty_track() {
        assert!(VisemeTrack::from_json("[{\"time\": \"soon\"}]").is_empty());
        assert!(VisemeTrack::from_json("not json").is_empty());
        assert!(VisemeTrack::try_from_json("not json").is_err());
    }

    #[test]
    fn frame_clock_accumulates() {
        let mut clock = FrameClock::default();
        clock.advance(0.5);
        assert_eq!(clock.advance(0.25), 0.75);
        assert_eq!(clock.frame, 2);
        clock.reset();
        assert_eq!(clock.elapsed_seconds, 0.0);
    }
}
