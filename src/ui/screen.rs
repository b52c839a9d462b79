use ratatui::Frame;

use crate::{ui::filter_panel::render_filter_panel, App, AppState};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Typing screen - renders the typing UI using the App widget
pub struct TypingScreen;

impl Screen for TypingScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// Results screen - renders the results UI using the App widget
pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// Book filter screen - uses dedicated renderer
pub struct FilterScreen;

impl Screen for FilterScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_filter_panel(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Typing => Box::new(TypingScreen),
        AppState::Results => Box::new(ResultsScreen),
        AppState::Filter => Box::new(FilterScreen),
    }
}
