pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod source;
pub mod state;
pub mod stereo {
    pub mod autofit;
    pub mod mapping;
    pub mod placement;
}
pub mod render {
    pub mod eyes;
}
pub mod tasks {
    pub mod immersive;
    pub mod loader;
    pub mod viewer;
    pub mod watch;
}
