use crate::router::RouterService;

const DEFAULT_APP_NAME: &str = "EdgeRelay App";

/// A router plus the name it is deployed under.
pub struct App {
    router: RouterService,
    name: String,
}

impl App {
    pub fn new(router: RouterService) -> Self {
        Self::with_name(router, DEFAULT_APP_NAME)
    }

    pub fn with_name<S>(router: RouterService, name: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            router,
            name: name.into(),
        }
    }

    pub fn router(&self) -> &RouterService {
        &self.router
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name<S>(&mut self, name: S)
    where
        S: Into<String>,
    {
        self.name = name.into();
    }

    pub fn into_router(self) -> RouterService {
        self.router
    }
}

/// Implemented once per application; adapters call [`Hooks::build_app`] at startup.
pub trait Hooks {
    fn routes() -> RouterService;

    fn name() -> &'static str {
        DEFAULT_APP_NAME
    }

    fn configure(_app: &mut App) {}

    fn build_app() -> App
    where
        Self: Sized,
    {
        let mut app = App::with_name(Self::routes(), Self::name());
        Self::configure(&mut app);
        app
    }
}
