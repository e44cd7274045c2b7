pub mod device_picker;
pub mod playback;
pub mod search_panel;
pub mod upcoming;
