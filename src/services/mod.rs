pub mod engine;
pub mod metadata;
pub mod packager;
pub mod stripper;
pub mod workspace;
