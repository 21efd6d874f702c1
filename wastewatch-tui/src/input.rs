use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Screen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Quit,
    /// Reload whatever the current screen shows
    Refresh,
    /// Run `service.generate_route`() and reload the dashboard
    GenerateRoute,
    /// Move the selected route one step along its lifecycle
    AdvanceRoute,
    /// Delete the route waiting in `app.pending_delete`
    DeleteRoute,
    /// Write the text report for the loaded dashboard
    ExportReport,
    /// Draw the path of the next route on the map
    NextMapRoute,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{BackTab, Char, Down, Esc, Right, Tab, Up};

    // Global quit shortcuts
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    // A pending delete swallows the next key
    if app.pending_delete.is_some() {
        if matches!(key.code, Char('y' | 'Y')) {
            return Action::DeleteRoute;
        }
        app.pending_delete = None;
        app.notice = Some("Delete cancelled".into());
        return Action::None;
    }

    if key.code == Char('q') && key.modifiers.is_empty() {
        return Action::Quit;
    }

    match key.code {
        Tab => {
            let next = app.screen.next();
            return switch(app, next);
        }
        BackTab => {
            let previous = app.screen.previous();
            return switch(app, previous);
        }
        Char('1') => return switch(app, Screen::Dashboard),
        Char('2') => return switch(app, Screen::Map),
        Char('3') => return switch(app, Screen::Monitor),
        Char('4') => return switch(app, Screen::Statistics),
        Char('r') => return Action::Refresh,
        Char('e') => return Action::ExportReport,
        Esc => {
            app.error_message = None;
            app.notice = None;
            return Action::None;
        }
        _ => {}
    }

    let mut action = Action::None;

    match app.screen {
        Screen::Dashboard => match key.code {
            Up | Char('k') => app.select_previous_route(),
            Down | Char('j') => app.select_next_route(),
            Char('g') => action = Action::GenerateRoute,
            Char('a') => action = Action::AdvanceRoute,
            Char('d') => {
                if let Some(route) = app.selected_route() {
                    app.pending_delete = Some(route.id.clone());
                }
            }
            Char('m') => app.show_all_active = !app.show_all_active,
            _ => {}
        },

        Screen::Map => match key.code {
            Right | Char('n') => action = Action::NextMapRoute,
            _ => {}
        },

        Screen::Monitor | Screen::Statistics => {}
    }
    action
}

fn switch(app: &mut App, screen: Screen) -> Action {
    if app.screen == screen {
        return Action::None;
    }
    app.switch_screen(screen);
    match screen {
        // The poller fetches on its own
        Screen::Monitor => Action::None,
        Screen::Dashboard | Screen::Map | Screen::Statistics => Action::Refresh,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wastewatch_core::RouteId;

    use super::*;
    use crate::app::route;

    fn press(app: &mut App, code: KeyCode) -> Action {
        handle_key_event(KeyEvent::new(code, KeyModifiers::NONE), app)
    }

    #[tokio::test]
    async fn delete_asks_for_confirmation() {
        let mut app = App::offline().with_routes(vec![route("r1"), route("r2")]);

        press(&mut app, KeyCode::Down);
        assert_eq!(press(&mut app, KeyCode::Char('d')), Action::None);
        assert_eq!(app.pending_delete, Some(RouteId::from("r2")));
        assert_eq!(press(&mut app, KeyCode::Char('y')), Action::DeleteRoute);
    }

    #[tokio::test]
    async fn any_other_key_cancels_delete() {
        let mut app = App::offline().with_routes(vec![route("r1")]);

        press(&mut app, KeyCode::Char('d'));
        assert_eq!(press(&mut app, KeyCode::Char('q')), Action::None, "q only cancels");
        assert!(app.pending_delete.is_none(), "delete cancelled");
    }

    #[tokio::test]
    async fn number_keys_switch_screens_and_reload() {
        let mut app = App::offline();

        assert_eq!(press(&mut app, KeyCode::Char('4')), Action::Refresh);
        assert_eq!(app.screen, Screen::Statistics);
        assert_eq!(press(&mut app, KeyCode::Char('3')), Action::None);
        assert_eq!(app.screen, Screen::Monitor);
        assert_eq!(press(&mut app, KeyCode::Char('3')), Action::None, "already there");
    }

    #[tokio::test]
    async fn toggle_more_routes() {
        let mut app = App::offline();

        press(&mut app, KeyCode::Char('m'));
        assert!(app.show_all_active, "expanded");
        press(&mut app, KeyCode::Char('m'));
        assert!(!app.show_all_active, "collapsed");
    }
}
