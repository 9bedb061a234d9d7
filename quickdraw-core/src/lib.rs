pub mod countdown;
pub mod game_events;
pub mod permissions;
pub mod round;
pub mod settings;
pub mod speech;
pub mod word_catalog;

// Re-export main components
pub use countdown::*;
pub use game_events::*;
pub use permissions::*;
pub use round::*;
pub use settings::*;
pub use speech::*;
pub use word_catalog::*;
