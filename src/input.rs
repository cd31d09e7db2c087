#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    PrevCategory,
    NextCategory,
    Select,
    Back,
    ContextMenu,
    AddGame,
    ToggleView,
    OpenSettings,
    Refresh,
    Quit,
}
