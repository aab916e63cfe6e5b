pub mod fake_session;
pub mod fixture;

#[cfg(test)]
mod scenarios;
