//! roadplot - compose OpenStreetMap data into weighted line drawings and plot
//! them on an EBB pen plotter
//!
//! Data flows through the crate in one direction: [`osm`] ingests and
//! classifies map records, [`projection`] maps geographic coordinates onto a
//! kilometer-scaled plane, [`compose`] buffers, unions and crops the classes
//! into plain line paths, and [`pipeline`] fits the resulting [`drawing`] to
//! the page and hands it to the renderer or the [`device`] session.

pub mod cli;
pub mod compose;
pub mod device;
pub mod drawing;
pub mod osm;
pub mod pipeline;
pub mod projection;
