use ctrlz_core::{ChannelSet, CycleInfo, SchedulerHandle, Worker};

type Callback<S> = Box<dyn FnMut(&SchedulerHandle<S>, &CycleInfo<'_>) + Send>;

/// Callback Worker - runs a closure every cycle
///
/// For glue logic that does not deserve its own type: forwarding a channel,
/// polling a flag, printing a value during bring-up.
pub struct CallbackWorker<S: ChannelSet> {
    name: String,
    handle: SchedulerHandle<S>,
    callback: Callback<S>,
    config: serde_json::Value,
}

impl<S: ChannelSet> CallbackWorker<S> {
    pub fn new<F>(name: &str, handle: SchedulerHandle<S>, callback: F) -> Self
    where
        F: FnMut(&SchedulerHandle<S>, &CycleInfo<'_>) + Send + 'static,
    {
        Self::with_config(name, handle, callback, serde_json::Value::Null)
    }

    /// Keep a configuration block alongside the callback
    pub fn with_config<F>(
        name: &str,
        handle: SchedulerHandle<S>,
        callback: F,
        config: serde_json::Value,
    ) -> Self
    where
        F: FnMut(&SchedulerHandle<S>, &CycleInfo<'_>) + Send + 'static,
    {
        Self {
            name: name.to_string(),
            handle,
            callback: Box::new(callback),
            config,
        }
    }

    pub fn config(&self) -> &serde_json::Value {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut serde_json::Value {
        &mut self.config
    }
}

impl<S: ChannelSet> Worker for CallbackWorker<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, cycle: &CycleInfo<'_>) {
        (self.callback)(&self.handle, cycle);
    }
}
