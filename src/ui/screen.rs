use ratatui::Frame;

use crate::app::{App, Mode};
use crate::ui::{render_countdown, render_permission, render_playing, render_results};

/// A UI Screen boundary: renders one mode of the app
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Motion permission prompt
pub struct PermissionScreen;

impl Screen for PermissionScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let area = f.area();
        render_permission(app, area, f.buffer_mut());
    }
}

pub struct CountdownScreen;

impl Screen for CountdownScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let area = f.area();
        render_countdown(app, area, f.buffer_mut());
    }
}

/// Card, timer and running score
pub struct PlayingScreen;

impl Screen for PlayingScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let area = f.area();
        render_playing(app, area, f.buffer_mut());
    }
}

pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let area = f.area();
        render_results(app, area, f.buffer_mut());
    }
}

/// Helper to construct the appropriate screen for the current mode
pub fn current_screen(mode: Mode) -> Box<dyn Screen> {
    match mode {
        Mode::Permission => Box::new(PermissionScreen),
        Mode::Countdown => Box::new(CountdownScreen),
        Mode::Playing => Box::new(PlayingScreen),
        Mode::Results => Box::new(ResultsScreen),
    }
}
