use super::error::{BrowserError, LoaderError, SelectionError};
use super::event::{AnnotationSpec, ColorChannel, RenderMode};
use super::geometry::DetectorProfile;
use super::loader::{missing_fields, read_event};
use super::projector::{project_event, ProjectedEvent};
use super::render::Renderer;
use super::scene::{DisplayOptions, Scene, TimeWindow, ViewState};
use super::selection::EventSelection;
use super::source::EventSource;

#[derive(Debug, Clone, PartialEq)]
pub enum BrowserState {
    Idle,
    Displaying(ViewState),
    Closed,
}

/// A user request, as emitted by the UI
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserAction {
    Open(EventSelection, DisplayOptions),
    Next,
    Previous,
    Seek(usize),
    JumpTo(usize),
    SetChannel(ColorChannel),
    SetTimeWindow(f64, f64),
    SetMode(RenderMode),
    SetPhotonTracks(bool),
    Close,
}

/// Interactive walk through a selection of events.
///
/// Only the displayed event is held in memory. Every transition that changes what is
/// shown renders exactly once; a transition that would change nothing returns `Ok(false)`
/// without rendering. A failed transition leaves the state untouched.
#[derive(Debug)]
pub struct EventBrowser<S: EventSource, R: Renderer> {
    source: S,
    profile: DetectorProfile,
    annotations: Vec<AnnotationSpec>,
    renderer: R,
    state: BrowserState,
    indices: Vec<usize>,
    current: Option<ProjectedEvent>,
    missing: Vec<LoaderError>,
    render_count: usize,
}

impl<S: EventSource, R: Renderer> EventBrowser<S, R> {
    pub fn new(
        source: S,
        profile: DetectorProfile,
        annotations: Vec<AnnotationSpec>,
        renderer: R,
    ) -> Self {
        Self {
            source,
            profile,
            annotations,
            renderer,
            state: BrowserState::Idle,
            indices: Vec::new(),
            current: None,
            missing: Vec::new(),
            render_count: 0,
        }
    }

    /// Dispatch a UI action to the matching transition
    pub fn apply(&mut self, action: BrowserAction) -> Result<bool, BrowserError> {
        match action {
            BrowserAction::Open(selection, options) => {
                self.open(&selection, options).map(|_| true)
            }
            BrowserAction::Next => self.next(),
            BrowserAction::Previous => self.previous(),
            BrowserAction::Seek(position) => self.seek(position),
            BrowserAction::JumpTo(index) => self.jump_to(index),
            BrowserAction::SetChannel(channel) => self.set_channel(channel),
            BrowserAction::SetTimeWindow(lo, hi) => self.set_time_window(lo, hi),
            BrowserAction::SetMode(mode) => self.set_mode(mode),
            BrowserAction::SetPhotonTracks(show) => self.set_photon_tracks(show),
            BrowserAction::Close => Ok(self.close()),
        }
    }

    /// Resolve a selection and display its first event
    pub fn open(
        &mut self,
        selection: &EventSelection,
        options: DisplayOptions,
    ) -> Result<(), BrowserError> {
        if self.state == BrowserState::Closed {
            return Err(BrowserError::Closed);
        }
        let indices = selection.resolve(self.source.n_events())?;
        if indices.is_empty() {
            return Err(SelectionError::Empty.into());
        }
        let missing = missing_fields(&self.source, &self.annotations);
        for error in missing.iter() {
            log::error!("{error}");
        }
        let event = self.load(indices[0])?;
        let view = ViewState::new(0, &event, options);
        self.commit(view, Some(event))?;
        log::info!(
            "Opened selection {} with {} events",
            selection,
            indices.len()
        );
        self.indices = indices;
        self.missing = missing;
        Ok(())
    }

    pub fn next(&mut self) -> Result<bool, BrowserError> {
        let view = self.displaying()?;
        if view.position + 1 >= self.indices.len() {
            return Ok(false);
        }
        self.move_to(view, view.position + 1)
    }

    pub fn previous(&mut self) -> Result<bool, BrowserError> {
        let view = self.displaying()?;
        if view.position == 0 {
            return Ok(false);
        }
        self.move_to(view, view.position - 1)
    }

    /// Move to a position in the selection, clamped to its last entry
    pub fn seek(&mut self, position: usize) -> Result<bool, BrowserError> {
        let view = self.displaying()?;
        let position = position.min(self.indices.len().saturating_sub(1));
        if position == view.position {
            return Ok(false);
        }
        self.move_to(view, position)
    }

    /// Move to the first position of the selection holding this event index
    pub fn jump_to(&mut self, event_index: usize) -> Result<bool, BrowserError> {
        let view = self.displaying()?;
        if view.event_index == event_index {
            return Ok(false);
        }
        let position = self
            .indices
            .iter()
            .position(|i| *i == event_index)
            .ok_or(SelectionError::NotSelected(event_index))?;
        self.move_to(view, position)
    }

    pub fn set_channel(&mut self, channel: ColorChannel) -> Result<bool, BrowserError> {
        let view = self.displaying()?;
        if view.channel == channel {
            return Ok(false);
        }
        self.commit(ViewState { channel, ..view }, None)?;
        Ok(true)
    }

    pub fn set_time_window(&mut self, lo: f64, hi: f64) -> Result<bool, BrowserError> {
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(BrowserError::InvalidTimeWindow(lo, hi));
        }
        let view = self.displaying()?;
        let time_window = TimeWindow::new(lo, hi);
        if view.time_window == time_window {
            return Ok(false);
        }
        self.commit(ViewState { time_window, ..view }, None)?;
        Ok(true)
    }

    pub fn set_mode(&mut self, mode: RenderMode) -> Result<bool, BrowserError> {
        let view = self.displaying()?;
        if view.mode == mode {
            return Ok(false);
        }
        self.commit(ViewState { mode, ..view }, None)?;
        Ok(true)
    }

    pub fn set_photon_tracks(&mut self, show_photon_tracks: bool) -> Result<bool, BrowserError> {
        let view = self.displaying()?;
        if view.show_photon_tracks == show_photon_tracks {
            return Ok(false);
        }
        self.commit(
            ViewState {
                show_photon_tracks,
                ..view
            },
            None,
        )?;
        Ok(true)
    }

    /// End the session. Returns false if it was already closed
    pub fn close(&mut self) -> bool {
        if self.state == BrowserState::Closed {
            return false;
        }
        self.state = BrowserState::Closed;
        self.current = None;
        self.indices.clear();
        log::info!("Event browser closed");
        true
    }

    pub fn state(&self) -> &BrowserState {
        &self.state
    }

    pub fn view(&self) -> Option<ViewState> {
        match &self.state {
            BrowserState::Displaying(view) => Some(*view),
            _ => None,
        }
    }

    pub fn event(&self) -> Option<&ProjectedEvent> {
        self.current.as_ref()
    }

    /// The scene of the current view, built on demand. Does not render
    pub fn scene(&self) -> Option<Scene> {
        let view = self.view()?;
        let event = self.current.as_ref()?;
        Some(Scene::build(event, &self.profile, &view))
    }

    /// The resolved selection, as on-disk event indices
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Annotation fields requested at the last open that the source does not have
    pub fn missing_fields(&self) -> &[LoaderError] {
        &self.missing
    }

    pub fn render_count(&self) -> usize {
        self.render_count
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    fn displaying(&self) -> Result<ViewState, BrowserError> {
        match &self.state {
            BrowserState::Displaying(view) => Ok(*view),
            BrowserState::Idle => Err(BrowserError::NotDisplaying),
            BrowserState::Closed => Err(BrowserError::Closed),
        }
    }

    fn load(&self, event_index: usize) -> Result<ProjectedEvent, BrowserError> {
        let event = read_event(&self.source, event_index, &self.annotations)?;
        Ok(project_event(event, &self.profile))
    }

    /// Show the event at a position, keeping the display options but resetting the time
    /// window. The event is only read if it is not the one already loaded
    fn move_to(&mut self, view: ViewState, position: usize) -> Result<bool, BrowserError> {
        let event_index = self.indices[position];
        match &self.current {
            Some(current) if current.event.index == event_index => {
                let next = ViewState::new(position, current, view.options());
                self.commit(next, None)?;
            }
            _ => {
                let event = self.load(event_index)?;
                let next = ViewState::new(position, &event, view.options());
                self.commit(next, Some(event))?;
            }
        }
        Ok(true)
    }

    /// Render the new view; the state only changes once rendering succeeded
    fn commit(&mut self, view: ViewState, event: Option<ProjectedEvent>) -> Result<(), BrowserError> {
        let scene = match (&event, &self.current) {
            (Some(event), _) | (None, Some(event)) => Scene::build(event, &self.profile, &view),
            (None, None) => return Err(BrowserError::NotDisplaying),
        };
        self.renderer.render(&scene)?;
        self.render_count += 1;
        if event.is_some() {
            self.current = event;
        }
        self.state = BrowserState::Displaying(view);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::event::{Event, Hit, Track};
    use crate::geometry::ProfileRegistry;
    use crate::source::MemorySource;
    use std::cell::Cell;

    #[derive(Debug, Default)]
    struct CountingRenderer {
        scenes: Vec<Scene>,
    }

    impl Renderer for CountingRenderer {
        fn render(&mut self, scene: &Scene) -> Result<(), RenderError> {
            self.scenes.push(scene.clone());
            Ok(())
        }
    }

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn render(&mut self, _scene: &Scene) -> Result<(), RenderError> {
            Err(RenderError::DrawingError(String::from("no display")))
        }
    }

    /// Counts how many events were read
    struct CountingSource {
        inner: MemorySource,
        reads: Cell<usize>,
    }

    impl EventSource for CountingSource {
        fn n_events(&self) -> usize {
            self.inner.n_events()
        }

        fn read_hits(&self, index: usize) -> Result<Vec<Hit>, LoaderError> {
            self.reads.set(self.reads.get() + 1);
            self.inner.read_hits(index)
        }

        fn has_scalar(&self, field: &str) -> bool {
            self.inner.has_scalar(field)
        }

        fn read_scalar(&self, field: &str, index: usize) -> Result<f64, LoaderError> {
            self.inner.read_scalar(field, index)
        }

        fn scalar_names(&self) -> Vec<String> {
            self.inner.scalar_names()
        }
    }

    fn source() -> MemorySource {
        let events = (0..5)
            .map(|index| Event {
                index,
                hits: (0..3)
                    .map(|i| {
                        let t = (10 * index + i) as f64;
                        Hit::new([1690.0, 0.0, 100.0 * i as f64], 1.0 + i as f64, t)
                    })
                    .collect(),
                annotations: vec![],
                tracks: vec![
                    Track {
                        track_id: 1,
                        parent_id: 0,
                        pid: 13,
                        start: [0.0; 3],
                        stop: [500.0, 0.0, 0.0],
                    },
                    Track {
                        track_id: 2,
                        parent_id: 1,
                        pid: 0,
                        start: [100.0, 0.0, 0.0],
                        stop: [1690.0, 0.0, 0.0],
                    },
                ],
            })
            .collect();
        MemorySource::new(events).with_scalar("energy", vec![1.0, 2.0, 3.0, 4.0, 5.0])
    }

    fn browser_over<S: EventSource, R: Renderer>(source: S, renderer: R) -> EventBrowser<S, R> {
        let registry = ProfileRegistry::new().unwrap();
        let profile = registry.get("SK").unwrap().clone();
        EventBrowser::new(
            source,
            profile,
            vec![AnnotationSpec::new("energy", "MeV")],
            renderer,
        )
    }

    fn browser<R: Renderer>(renderer: R) -> EventBrowser<MemorySource, R> {
        browser_over(source(), renderer)
    }

    #[test]
    fn test_open_defaults() {
        let mut browser = browser(CountingRenderer::default());
        assert_eq!(browser.state(), &BrowserState::Idle);
        browser
            .open(&"1:4".parse().unwrap(), DisplayOptions::default())
            .unwrap();
        let view = browser.view().unwrap();
        assert_eq!(view.event_index, 1);
        assert_eq!(view.channel, ColorChannel::Charge);
        assert_eq!(view.time_window, TimeWindow::new(10.0, 12.0));
        assert_eq!(browser.render_count(), 1);
        assert_eq!(browser.indices(), &[1, 2, 3]);
        let scene = &browser.renderer().scenes[0];
        assert!(scene.subtitle.contains("energy = 2.00 MeV"));
    }

    #[test]
    fn test_navigation_saturates() {
        let mut browser = browser(CountingRenderer::default());
        browser
            .open(&"0:3".parse().unwrap(), DisplayOptions::default())
            .unwrap();
        assert!(!browser.previous().unwrap());
        assert!(browser.next().unwrap());
        assert!(browser.next().unwrap());
        assert!(!browser.next().unwrap());
        assert_eq!(browser.view().unwrap().event_index, 2);
        assert_eq!(browser.render_count(), 3);
        assert!(browser.previous().unwrap());
        assert_eq!(browser.view().unwrap().event_index, 1);
        assert_eq!(browser.render_count(), 4);
    }

    #[test]
    fn test_view_changes_render_once() {
        let mut browser = browser(CountingRenderer::default());
        browser.open(&EventSelection::All, DisplayOptions::default()).unwrap();
        assert!(browser.set_channel(ColorChannel::Time).unwrap());
        assert!(!browser.set_channel(ColorChannel::Time).unwrap());
        assert!(browser.set_time_window(0.0, 1.0).unwrap());
        assert!(!browser.set_time_window(0.0, 1.0).unwrap());
        assert!(browser.set_mode(RenderMode::Volume).unwrap());
        assert_eq!(browser.render_count(), 4);
        let _ = browser.scene();
        let _ = browser.view();
        assert_eq!(browser.render_count(), 4);
        assert_eq!(browser.renderer().scenes[2].markers.len(), 2);
    }

    #[test]
    fn test_preferences_persist_but_window_resets() {
        let mut browser = browser(CountingRenderer::default());
        browser.open(&EventSelection::All, DisplayOptions::default()).unwrap();
        browser.set_channel(ColorChannel::Time).unwrap();
        browser.set_mode(RenderMode::Volume).unwrap();
        browser.set_time_window(0.0, 0.5).unwrap();
        browser.next().unwrap();
        let view = browser.view().unwrap();
        assert_eq!(view.channel, ColorChannel::Time);
        assert_eq!(view.mode, RenderMode::Volume);
        assert_eq!(view.time_window, TimeWindow::new(10.0, 12.0));
    }

    #[test]
    fn test_invalid_time_window() {
        let mut browser = browser(CountingRenderer::default());
        browser.open(&EventSelection::All, DisplayOptions::default()).unwrap();
        assert!(matches!(
            browser.set_time_window(5.0, 1.0),
            Err(BrowserError::InvalidTimeWindow(..))
        ));
        assert!(matches!(
            browser.set_time_window(f64::NAN, 1.0),
            Err(BrowserError::InvalidTimeWindow(..))
        ));
        assert_eq!(browser.render_count(), 1);
    }

    #[test]
    fn test_jump_and_seek() {
        let mut browser = browser(CountingRenderer::default());
        browser
            .open(&"4|0|2".parse().unwrap(), DisplayOptions::default())
            .unwrap();
        assert!(browser.jump_to(2).unwrap());
        assert_eq!(browser.view().unwrap().position, 2);
        assert!(!browser.jump_to(2).unwrap());
        assert!(matches!(
            browser.jump_to(3),
            Err(BrowserError::SelectionError(SelectionError::NotSelected(3)))
        ));
        assert_eq!(browser.view().unwrap().event_index, 2);
        assert!(browser.seek(99).is_ok_and(|moved| !moved));
        assert!(browser.seek(0).unwrap());
        assert_eq!(browser.view().unwrap().event_index, 4);
        assert_eq!(browser.render_count(), 3);
    }

    #[test]
    fn test_open_errors() {
        let mut browser = browser(CountingRenderer::default());
        assert!(matches!(
            browser.open(&"7".parse().unwrap(), DisplayOptions::default()),
            Err(BrowserError::SelectionError(SelectionError::OutOfRange { index: 7, .. }))
        ));
        assert!(matches!(
            browser.open(&"2:2".parse().unwrap(), DisplayOptions::default()),
            Err(BrowserError::SelectionError(SelectionError::Empty))
        ));
        assert!(matches!(browser.next(), Err(BrowserError::NotDisplaying)));
        assert_eq!(browser.state(), &BrowserState::Idle);
    }

    #[test]
    fn test_close() {
        let mut browser = browser(CountingRenderer::default());
        browser.open(&EventSelection::All, DisplayOptions::default()).unwrap();
        assert!(browser.apply(BrowserAction::Close).unwrap());
        assert_eq!(browser.state(), &BrowserState::Closed);
        assert!(browser.event().is_none());
        assert!(browser.indices().is_empty());
        assert!(!browser.close());
        assert!(matches!(browser.next(), Err(BrowserError::Closed)));
        assert!(matches!(
            browser.open(&EventSelection::All, DisplayOptions::default()),
            Err(BrowserError::Closed)
        ));
    }

    #[test]
    fn test_failed_render_keeps_state() {
        let mut browser = browser(FailingRenderer);
        assert!(browser
            .open(&EventSelection::All, DisplayOptions::default())
            .is_err());
        assert_eq!(browser.state(), &BrowserState::Idle);
        assert_eq!(browser.render_count(), 0);
    }

    #[test]
    fn test_apply_dispatch() {
        let mut browser = browser(CountingRenderer::default());
        let actions = [
            BrowserAction::Open(
                EventSelection::All,
                DisplayOptions {
                    mode: RenderMode::Volume,
                    ..Default::default()
                },
            ),
            BrowserAction::Next,
            BrowserAction::SetChannel(ColorChannel::Time),
            BrowserAction::JumpTo(4),
            BrowserAction::Previous,
            BrowserAction::SetPhotonTracks(true),
        ];
        for action in actions {
            assert!(browser.apply(action).unwrap());
        }
        let view = browser.view().unwrap();
        assert_eq!(view.event_index, 3);
        assert_eq!(view.mode, RenderMode::Volume);
        assert!(view.show_photon_tracks);
        assert_eq!(browser.render_count(), 6);
    }

    #[test]
    fn test_open_with_options_renders_once() {
        let mut browser = browser(CountingRenderer::default());
        let options = DisplayOptions {
            channel: ColorChannel::Time,
            mode: RenderMode::Volume,
            show_photon_tracks: false,
        };
        browser.open(&"2".parse().unwrap(), options).unwrap();
        assert_eq!(browser.render_count(), 1);
        let view = browser.view().unwrap();
        assert_eq!(view.options(), options);
        assert_eq!(browser.renderer().scenes[0].channel, ColorChannel::Time);
        assert!(!browser.set_channel(ColorChannel::Time).unwrap());
        assert_eq!(browser.render_count(), 1);
    }

    #[test]
    fn test_duplicate_selection_reads_once() {
        let source = CountingSource {
            inner: source(),
            reads: Cell::new(0),
        };
        let mut browser = browser_over(source, CountingRenderer::default());
        browser
            .open(&"1|1|2".parse().unwrap(), DisplayOptions::default())
            .unwrap();
        browser.set_time_window(10.0, 10.5).unwrap();
        assert_eq!(browser.source.reads.get(), 1);

        assert!(browser.next().unwrap());
        let view = browser.view().unwrap();
        assert_eq!((view.position, view.event_index), (1, 1));
        assert_eq!(view.time_window, TimeWindow::new(10.0, 12.0));
        assert_eq!(browser.source.reads.get(), 1);

        assert!(browser.next().unwrap());
        assert_eq!(browser.view().unwrap().event_index, 2);
        assert_eq!(browser.source.reads.get(), 2);
        assert_eq!(browser.render_count(), 4);
    }

    #[test]
    fn test_photon_track_toggle() {
        let mut browser = browser(CountingRenderer::default());
        let options = DisplayOptions {
            mode: RenderMode::Volume,
            ..Default::default()
        };
        browser.open(&EventSelection::All, options).unwrap();
        assert_eq!(browser.renderer().scenes[0].tracks.len(), 1);
        assert!(browser.set_photon_tracks(true).unwrap());
        assert!(!browser.set_photon_tracks(true).unwrap());
        assert_eq!(browser.renderer().scenes[1].tracks.len(), 2);
        browser.next().unwrap();
        assert!(browser.view().unwrap().show_photon_tracks);
        assert_eq!(browser.renderer().scenes[2].tracks.len(), 2);
        assert_eq!(browser.render_count(), 3);
    }
}
