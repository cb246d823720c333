pub mod chat_panel;
pub mod checkpoint_modal;
pub mod lesson_panel;
