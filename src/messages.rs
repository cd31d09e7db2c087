use std::path::PathBuf;

use crate::input::Action;
use crate::library::LibrarySnapshot;
use crate::ui_state::FormField;

#[derive(Debug, Clone)]
pub enum Message {
    LibraryLoaded(Result<LibrarySnapshot, String>),
    ArtFetched(Vec<(String, PathBuf)>),
    Input(Action),
    WheelScrolled(f32),
    WindowResized(f32, f32),
    SearchChanged(String),
    FieldChanged(FormField, String),
    ActivateRow(usize),
    SubmitForm,
    CloseModal,
    GameExited,
}
