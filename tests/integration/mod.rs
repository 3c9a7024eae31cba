//! Integration tests for the ripple dependency-graph engine

mod config_layering;
mod support;
mod sweep;
mod sub_nodes;
