use aster_core::cli::EngineArgs;

use crate::main_loop::EngineLoop;

mod app;
mod engine;
mod main_loop;

pub use app::{App, RenderableApp};
pub use engine::Engine;

pub use paste::paste;

macro_rules! module_facade {
    ($name:ident) => {
        $crate::paste! {
            pub mod $name {
                pub use [<aster_ $name>]::*;
            }
        }
    };
}

module_facade!(core);
module_facade!(renderer);
module_facade!(rhi);

/// Launch main engine loop with specific App.
pub fn launch<A: RenderableApp>() -> Result<(), anyhow::Error> {
    let args = EngineArgs::parse_args();
    aster_core::logging::initialize(args.log_level.into())?;

    let app = A::new(&args)?;

    let main_loop = EngineLoop::new(app)?;
    main_loop.run()?;

    Ok(())
}
