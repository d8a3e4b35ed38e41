pub mod echo;
pub mod remote;

pub use echo::EchoPlugin;
pub use remote::{RemoteInvocationPayload, RemotePlugin};

use super::dto::{PluginDefinition, PluginKind};
use super::traits::Plugin;

pub fn build_plugin(definition: &PluginDefinition) -> Box<dyn Plugin> {
    match definition.kind {
        PluginKind::Echo => Box::new(EchoPlugin::new(definition.info())),
        PluginKind::Remote => Box::new(RemotePlugin::new(definition)),
    }
}
