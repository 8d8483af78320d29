mod common;
mod policy;
mod rule_test;
