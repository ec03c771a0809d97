
#[cfg(test)]
mod auth_tests;
#[cfg(test)]
mod attendance_tests;
#[cfg(test)]
mod activity_tests;
