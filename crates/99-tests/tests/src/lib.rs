//! End-to-end suite running the bridge against a real worker thread.

#[cfg(test)]
mod support;

#[cfg(test)]
mod native_e2e;

#[cfg(test)]
mod ordering;

#[cfg(test)]
mod touch_e2e;
