use tracing_subscriber::EnvFilter;

mod art_cache;
mod covers;
mod enrichment;
mod game_sources;
mod gamepad;
mod input;
mod launcher;
mod library;
mod manual_games;
mod messages;
mod model;
mod navigation;
mod steam_path;
mod steam_store;
mod storage;
mod ui;
mod ui_components;
mod ui_main_view;
mod ui_modals;
mod ui_state;
mod ui_theme;
mod vdf;

use ui::Launcher;

fn main() -> iced::Result {
    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "game_shelf=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    iced::application(Launcher::new, Launcher::update, Launcher::view)
        .title(|launcher: &Launcher| launcher.title())
        .subscription(Launcher::subscription)
        .window(iced::window::Settings {
            size: iced::Size::new(1280.0, 800.0),
            ..Default::default()
        })
        .run()
}
