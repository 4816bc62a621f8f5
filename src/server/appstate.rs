use std::sync::Arc;

use crate::integration::Integration;

#[derive(Clone)]
pub struct AppState {
    integ: Arc<Integration>,
}

impl AppState {
    #[must_use]
    pub const fn new(integ: Arc<Integration>) -> Self {
        Self { integ }
    }

    #[must_use]
    pub const fn integration(&self) -> &Arc<Integration> {
        &self.integ
    }
}
