//! Recording fakes of [`MediaClient`] and [`MetadataStore`].
//!
//! Both fakes append to a shared call log so tests can assert on the exact
//! order of operations across the media service and the metadata store.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use liveops_core::{
    metadata_id, AccountScope, Asset, Channel, ChannelIdentity, ChannelMetadata, ChannelState,
    Error, LiveOutputRecord, Result, StreamingLocatorRecord,
};
use liveops_media::MediaClient;
use liveops_store::MetadataStore;

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Call {
    GetChannel(String),
    ListOutputs(String),
    GetAsset(String),
    ListLocators(String),
    GetLocator(String),
    DeleteOutput(String),
    DeleteAsset(String),
    DeletePolicy(String),
    StopChannel(String),
    DeleteChannel(String),
    DeleteMetadata(String),
}

impl Call {
    /// Whether the call changes remote state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::DeleteOutput(_)
                | Call::DeleteAsset(_)
                | Call::DeletePolicy(_)
                | Call::StopChannel(_)
                | Call::DeleteChannel(_)
                | Call::DeleteMetadata(_)
        )
    }
}

/// Shared, ordered call log.
pub type CallLog = Arc<Mutex<Vec<Call>>>;

#[derive(Default)]
struct MediaState {
    /// Successive `get_channel` answers; the last one repeats.
    channels: HashMap<String, VecDeque<Option<ChannelState>>>,
    outputs: HashMap<String, Vec<LiveOutputRecord>>,
    missing_assets: HashSet<String>,
    locators: HashMap<String, Vec<String>>,
    policies: HashMap<String, Option<String>>,
    failures: HashSet<Call>,
}

/// In-memory media account.
#[derive(Clone, Default)]
pub struct FakeMediaClient {
    state: Arc<Mutex<MediaState>>,
    log: CallLog,
}

impl FakeMediaClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account scope every fake resource lives in.
    pub fn scope() -> AccountScope {
        AccountScope {
            subscription_id: "sub".into(),
            resource_group: "rg".into(),
            account_name: "acct".into(),
        }
    }

    pub fn identity(&self, channel: &str) -> ChannelIdentity {
        ChannelIdentity::new(Self::scope(), channel)
    }

    pub fn with_channel(self, name: &str, state: ChannelState) -> Self {
        self.with_states(name, [state])
    }

    /// Channel whose `get_channel` answers walk through `states`.
    pub fn with_states(self, name: &str, states: impl IntoIterator<Item = ChannelState>) -> Self {
        self.state
            .lock()
            .channels
            .insert(name.to_string(), states.into_iter().map(Some).collect());
        self
    }

    /// After the configured states, the channel is no longer found.
    pub fn then_missing(self, name: &str) -> Self {
        self.state
            .lock()
            .channels
            .entry(name.to_string())
            .or_default()
            .push_back(None);
        self
    }

    pub fn with_output(self, channel: &str, output: &str, asset: &str) -> Self {
        self.state
            .lock()
            .outputs
            .entry(channel.to_string())
            .or_default()
            .push(LiveOutputRecord {
                name: output.to_string(),
                asset_name: asset.to_string(),
            });
        self
    }

    pub fn without_asset(self, asset: &str) -> Self {
        self.state.lock().missing_assets.insert(asset.to_string());
        self
    }

    pub fn with_locator(self, asset: &str, locator: &str, policy: Option<&str>) -> Self {
        {
            let mut state = self.state.lock();
            state
                .locators
                .entry(asset.to_string())
                .or_default()
                .push(locator.to_string());
            state
                .policies
                .insert(locator.to_string(), policy.map(str::to_string));
        }
        self
    }

    /// Make a specific call fail with a remote error.
    pub fn fail_on(self, call: Call) -> Self {
        self.state.lock().failures.insert(call);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().clone()
    }

    /// Mutating calls only, in order.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.log.lock().iter().filter(|c| pred(c)).count()
    }

    /// A store that records into this client's call log.
    pub fn store(&self) -> FakeStore {
        FakeStore::with_log(self.log.clone(), StoreMode::Configured)
    }

    pub fn unconfigured_store(&self) -> FakeStore {
        FakeStore::with_log(self.log.clone(), StoreMode::Unconfigured)
    }

    pub fn failing_store(&self) -> FakeStore {
        FakeStore::with_log(self.log.clone(), StoreMode::Failing)
    }

    fn record(&self, call: Call, operation: &str) -> Result<()> {
        let fail = self.state.lock().failures.contains(&call);
        self.log.lock().push(call);
        if fail {
            Err(Error::remote(operation, Some(500), "injected failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl MediaClient for FakeMediaClient {
    async fn get_channel(&self, _scope: &AccountScope, name: &str) -> Result<Option<Channel>> {
        self.record(Call::GetChannel(name.into()), "get live event")?;
        let mut state = self.state.lock();
        let Some(states) = state.channels.get_mut(name) else {
            return Ok(None);
        };
        let current = if states.len() > 1 {
            states.pop_front().flatten()
        } else {
            states.front().copied().flatten()
        };
        Ok(current.map(|state| Channel {
            name: name.to_string(),
            state,
        }))
    }

    async fn list_outputs(
        &self,
        _scope: &AccountScope,
        channel: &str,
    ) -> Result<Vec<LiveOutputRecord>> {
        self.record(Call::ListOutputs(channel.into()), "list live outputs")?;
        Ok(self
            .state
            .lock()
            .outputs
            .get(channel)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_asset(&self, _scope: &AccountScope, name: &str) -> Result<Option<Asset>> {
        self.record(Call::GetAsset(name.into()), "get asset")?;
        if self.state.lock().missing_assets.contains(name) {
            return Ok(None);
        }
        Ok(Some(Asset {
            name: name.to_string(),
            container: Some(format!("asset-{name}")),
        }))
    }

    async fn list_locators_for_asset(
        &self,
        _scope: &AccountScope,
        asset: &str,
    ) -> Result<Vec<String>> {
        self.record(Call::ListLocators(asset.into()), "list streaming locators")?;
        Ok(self
            .state
            .lock()
            .locators
            .get(asset)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_locator(
        &self,
        _scope: &AccountScope,
        name: &str,
    ) -> Result<Option<StreamingLocatorRecord>> {
        self.record(Call::GetLocator(name.into()), "get streaming locator")?;
        Ok(self
            .state
            .lock()
            .policies
            .get(name)
            .map(|policy| StreamingLocatorRecord {
                name: name.to_string(),
                streaming_policy_name: policy.clone(),
            }))
    }

    async fn delete_output(
        &self,
        _scope: &AccountScope,
        channel: &str,
        output: &str,
    ) -> Result<()> {
        self.record(Call::DeleteOutput(output.into()), "delete live output")?;
        if let Some(outputs) = self.state.lock().outputs.get_mut(channel) {
            outputs.retain(|o| o.name != output);
        }
        Ok(())
    }

    async fn delete_asset(&self, _scope: &AccountScope, name: &str) -> Result<()> {
        self.record(Call::DeleteAsset(name.into()), "delete asset")?;
        let mut state = self.state.lock();
        state.missing_assets.insert(name.to_string());
        state.locators.remove(name);
        Ok(())
    }

    async fn delete_policy(&self, _scope: &AccountScope, name: &str) -> Result<()> {
        self.record(Call::DeletePolicy(name.into()), "delete streaming policy")
    }

    async fn stop_channel(&self, _scope: &AccountScope, name: &str) -> Result<()> {
        self.record(Call::StopChannel(name.into()), "stop live event")?;
        if let Some(states) = self.state.lock().channels.get_mut(name) {
            *states = VecDeque::from([Some(ChannelState::Stopped)]);
        }
        Ok(())
    }

    async fn delete_channel(&self, _scope: &AccountScope, name: &str) -> Result<()> {
        self.record(Call::DeleteChannel(name.into()), "delete live event")?;
        self.state.lock().channels.remove(name);
        Ok(())
    }
}

/// How a [`FakeStore`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Configured,
    /// Behaves like a store with no backend: `Ok(false)`.
    Unconfigured,
    /// Every call fails with a store error.
    Failing,
}

/// In-memory metadata store.
#[derive(Clone)]
pub struct FakeStore {
    mode: StoreMode,
    records: Arc<Mutex<HashMap<String, ChannelMetadata>>>,
    log: CallLog,
}

impl FakeStore {
    pub fn new(mode: StoreMode) -> Self {
        Self::with_log(CallLog::default(), mode)
    }

    pub fn with_log(log: CallLog, mode: StoreMode) -> Self {
        Self {
            mode,
            records: Arc::default(),
            log,
        }
    }

    pub fn contains(&self, identity: &ChannelIdentity) -> bool {
        self.records.lock().contains_key(&metadata_id(identity))
    }

    fn check(&self) -> Result<bool> {
        match self.mode {
            StoreMode::Configured => Ok(true),
            StoreMode::Unconfigured => Ok(false),
            StoreMode::Failing => Err(Error::store("store unreachable")),
        }
    }
}

#[async_trait::async_trait]
impl MetadataStore for FakeStore {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn upsert(&self, record: &ChannelMetadata) -> Result<bool> {
        if !self.check()? {
            return Ok(false);
        }
        self.records
            .lock()
            .insert(record.id.clone(), record.clone());
        Ok(true)
    }

    async fn delete(&self, identity: &ChannelIdentity) -> Result<bool> {
        self.log
            .lock()
            .push(Call::DeleteMetadata(identity.channel_name.clone()));
        if !self.check()? {
            return Ok(false);
        }
        self.records.lock().remove(&metadata_id(identity));
        Ok(true)
    }

    async fn get(&self, identity: &ChannelIdentity) -> Result<Option<ChannelMetadata>> {
        if !self.check()? {
            return Ok(None);
        }
        Ok(self.records.lock().get(&metadata_id(identity)).cloned())
    }
}
