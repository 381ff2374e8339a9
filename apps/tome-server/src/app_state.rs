use tome_kernel::Kernel;

#[derive(Clone)]
pub(crate) struct AppState {
    kernel: Kernel,
}

impl AppState {
    pub fn new(kernel: Kernel) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }
}
