pub mod dbnotes;
