pub mod call_graph;
pub mod capabilities;
pub mod explain;
pub mod parse;
pub mod poc;
pub mod scan;
pub mod search_code;
pub mod taint;
pub mod vulnerabilities;
