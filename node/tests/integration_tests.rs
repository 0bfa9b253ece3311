//! Integration tests exercising the generation pipeline end to end:
//! slot check → block assembly → signing → bookkeeping → hand-over,
//! plus the administrative and gossip paths that feed it.
//!
//! Every collaborator is a `delos-nullables` stand-in, so the tests run
//! without a network or a state machine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use delos_consensus::{
    build_forger_list, compute_snapshot, CandidateWeight, ForgerList, SlotClock,
};
use delos_crypto::{merkle_root, verify_signature};
use delos_node::generator_store::{get_generated_info, set_generated_info};
use delos_node::keystore::{encrypt_generator_keys_with, KdfParams};
use delos_node::wire_message::{
    GetTransactionsResponse, TransactionsAnnouncement, WirePayload, RPC_GET_TRANSACTIONS,
};
use delos_node::{
    CollaboratorError, Endpoint, EndpointError, GeneratedInfo, Generator, GeneratorConfig,
    GeneratorDeps, GeneratorKeys, GeneratorMetrics, KeypairTable, Network, NetworkEndpoint,
    PlainGeneratorKeys, SetKeysRequest, TickOutcome, UpdateStatusRequest,
};
use delos_nullables::{
    NullBft, NullChain, NullClock, NullConsensus, NullGeneratorStore, NullNetwork,
    NullStateMachine, NullTransactionPool, ScriptedOutcome,
};
use delos_types::{
    Address, BftHeights, BftParameters, BlockHeader, BlockId, ChainId, PublicKey, RoundParams,
    Signature, Timestamp, Transaction, BLOCK_HEADER_VERSION,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const BLOCK_TIME: u64 = 10;
const CHEAP_KDF: KdfParams = KdfParams {
    memory: 1024,
    iterations: 1,
    parallelism: 1,
};

struct Harness {
    clock: Arc<NullClock>,
    consensus: Arc<NullConsensus>,
    bft: Arc<NullBft>,
    state_machine: Arc<NullStateMachine>,
    chain: Arc<NullChain>,
    network: Arc<NullNetwork>,
    pool: Arc<NullTransactionPool>,
    store: Arc<NullGeneratorStore>,
    keypairs: KeypairTable,
    generator: Arc<Generator>,
    address: Address,
    public_key: PublicKey,
}

fn header_at(height: u64, slot: u64) -> BlockHeader {
    BlockHeader {
        version: BLOCK_HEADER_VERSION,
        timestamp: Timestamp::new(slot * BLOCK_TIME),
        height,
        previous_block_id: BlockId::ZERO,
        generator_address: Address::ZERO,
        transaction_root: [0; 32],
        asset_root: [0; 32],
        event_root: [0; 32],
        state_root: [0; 32],
        max_height_prevoted: 0,
        max_height_generated: 0,
        implies_max_prevotes: false,
        validators_hash: [0; 32],
        aggregate_commit: Default::default(),
        signature: Signature::EMPTY,
    }
}

fn tx(sender: u8, nonce: u64, fee: u64) -> Transaction {
    Transaction {
        module: "token".into(),
        command: "transfer".into(),
        nonce,
        fee,
        sender_public_key: PublicKey([sender; 32]),
        params: vec![sender; 16],
        signatures: vec![],
    }
}

/// A chain whose tip is `height` at `slot`, with the local key scheduled
/// for every slot unless `scheduled` says otherwise.
async fn harness(height: u64, slot: u64, scheduled: bool) -> Harness {
    let keys = PlainGeneratorKeys::generate().unwrap();
    let address = keys.address();
    let public_key = PublicKey(keys.generator_key);

    let clock = Arc::new(NullClock::new(slot * BLOCK_TIME));
    let consensus = Arc::new(NullConsensus::new(
        SlotClock::new(Timestamp::new(0), BLOCK_TIME).unwrap(),
    ));
    let forger = if scheduled { address } else { Address::new([0xEE; 20]) };
    consensus.install_forger_list(ForgerList::new(1, vec![forger]));

    let bft = Arc::new(NullBft::new());
    bft.set_heights(BftHeights {
        max_height_prevoted: height.saturating_sub(1),
        max_height_precommitted: height.saturating_sub(1),
        max_height_certified: 0,
    });
    bft.set_parameters(
        1,
        BftParameters {
            prevote_threshold: 1,
            precommit_threshold: 1,
            certificate_threshold: 1,
            validators: vec![],
            validators_hash: [0x42; 32],
        },
    );

    let chain = Arc::new(NullChain::new());
    chain.add_header(header_at(height, slot));

    let state_machine = Arc::new(NullStateMachine::new());
    let network = Arc::new(NullNetwork::new());
    let pool = Arc::new(NullTransactionPool::new());
    let store = Arc::new(NullGeneratorStore::new());
    let keypairs = KeypairTable::new();

    let deps = GeneratorDeps {
        consensus: consensus.clone(),
        bft: bft.clone(),
        state_machine: state_machine.clone(),
        chain: chain.clone(),
        network: network.clone(),
        pool: pool.clone(),
        store: store.clone(),
        clock: clock.clone(),
    };
    let generator = Arc::new(
        Generator::new(
            GeneratorConfig::default(),
            deps,
            keypairs.clone(),
            Arc::new(GeneratorMetrics::new()),
        )
        .unwrap(),
    );

    let endpoint =
        Endpoint::new(store.clone(), keypairs.clone(), Arc::new(GeneratorMetrics::new()));
    endpoint
        .set_keys(SetKeysRequest {
            address: address.to_hex(),
            keys: GeneratorKeys::Plain(keys),
        })
        .await
        .unwrap();

    Harness {
        clock,
        consensus,
        bft,
        state_machine,
        chain,
        network,
        pool,
        store,
        keypairs,
        generator,
        address,
        public_key,
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scheduled_slot_produces_signed_block() {
    let h = harness(5, 5, true).await;
    let a0 = tx(1, 0, 5_000);
    let a1 = tx(1, 1, 5_000);
    let b0 = tx(2, 0, 1_000);
    for t in [&a0, &a1, &b0] {
        NullTransactionPool::add(&h.pool, t.clone());
    }
    h.clock.set(6 * BLOCK_TIME + 1);

    let outcome = h.generator.tick().await.unwrap();
    let TickOutcome::Generated { height, id } = outcome else {
        panic!("expected a generated block, got {outcome:?}");
    };
    assert_eq!(height, 6);

    let executed = h.consensus.executed();
    assert_eq!(executed.len(), 1);
    let block = &executed[0];
    let header = &block.header;
    assert_eq!(header.id().unwrap(), id);
    assert_eq!(header.timestamp, Timestamp::new(6 * BLOCK_TIME));
    assert_eq!(header.generator_address, h.address);
    assert_eq!(header.previous_block_id, header_at(5, 5).id().unwrap());
    assert_eq!(header.max_height_prevoted, 4);
    assert_eq!(header.max_height_generated, 0);
    assert_eq!(header.validators_hash, [0x42; 32]);
    assert_eq!(header.state_root, [0xAA; 32]);

    let signing_bytes = header.signing_bytes(&ChainId::DEVNET).unwrap();
    assert!(verify_signature(&signing_bytes, &header.signature, &h.public_key));

    assert_eq!(block.transactions, vec![a0.clone(), a1.clone(), b0.clone()]);
    let ids: Vec<[u8; 32]> = block
        .transactions
        .iter()
        .map(|t| *t.id().unwrap().as_bytes())
        .collect();
    assert_eq!(header.transaction_root, merkle_root(&ids));

    let info = get_generated_info(h.store.as_ref(), &h.address).unwrap().unwrap();
    assert_eq!(
        info,
        GeneratedInfo {
            height: 6,
            max_height_prevoted: 4,
            max_height_generated: 0,
        }
    );
    assert_eq!(h.state_machine.clear_count(), 1);
    assert_eq!(h.generator.metrics().blocks_generated.get(), 1);
}

#[tokio::test]
async fn header_carries_previously_generated_height() {
    let h = harness(20, 20, true).await;
    set_generated_info(
        h.store.as_ref(),
        &h.address,
        &GeneratedInfo {
            height: 17,
            max_height_prevoted: 15,
            max_height_generated: 12,
        },
    )
    .unwrap();
    h.clock.set(21 * BLOCK_TIME);

    h.generator.tick().await.unwrap();
    let block = h.consensus.executed().remove(0);
    assert_eq!(block.header.max_height_generated, 17);

    let info = get_generated_info(h.store.as_ref(), &h.address).unwrap().unwrap();
    assert_eq!(info.height, 21);
    assert_eq!(info.max_height_generated, 17);
}

#[tokio::test]
async fn filled_slot_is_not_produced_again() {
    let h = harness(5, 5, true).await;
    h.clock.set(5 * BLOCK_TIME + 9);
    assert_eq!(h.generator.tick().await.unwrap(), TickOutcome::SlotFilled);
    assert!(h.consensus.executed().is_empty());
}

#[tokio::test]
async fn slot_of_another_validator_is_skipped() {
    let h = harness(5, 5, false).await;
    h.clock.set(6 * BLOCK_TIME);
    assert_eq!(
        h.generator.tick().await.unwrap(),
        TickOutcome::NotScheduled(Address::new([0xEE; 20]))
    );
    assert!(h.consensus.executed().is_empty());
    assert_eq!(h.state_machine.clear_count(), 0);
}

#[tokio::test]
async fn missing_previous_block_waits_out_the_threshold() {
    let h = harness(5, 5, true).await;

    // Slot 7 with slot 6 empty: wait until two seconds into the slot.
    h.clock.set(7 * BLOCK_TIME + 2);
    assert_eq!(
        h.generator.tick().await.unwrap(),
        TickOutcome::WaitingForPreviousBlock
    );
    assert!(h.consensus.executed().is_empty());

    h.clock.set(7 * BLOCK_TIME + 3);
    assert!(matches!(
        h.generator.tick().await.unwrap(),
        TickOutcome::Generated { height: 6, .. }
    ));
}

fn candidate(address: Address, votes: u128) -> CandidateWeight {
    CandidateWeight {
        address,
        total_votes: votes,
        self_votes: votes,
        banned: false,
        pom_heights: vec![],
    }
}

#[tokio::test]
async fn forger_list_is_refreshed_when_a_round_closes() {
    let h = harness(2, 2, true).await;
    let params = RoundParams {
        number_active_validators: 2,
        number_standby_seats: 1,
        round_length: 3,
        min_weight_standby: 1,
        self_vote_factor: 10,
        punishment_window: 1_000,
        snapshot_retention_rounds: 1,
    };
    let other = Address::new([0x0A; 20]);
    let standby = Address::new([0x0B; 20]);
    let candidates = vec![
        candidate(h.address, 300),
        candidate(other, 200),
        candidate(standby, 50),
    ];
    let (seed1, seed2) = ([0x11; 32], [0x22; 32]);
    h.consensus.refresh_rounds(params.clone(), candidates.clone(), seed1, seed2);

    // Height 3 closes round 1 and prepares round 2.
    h.clock.set(3 * BLOCK_TIME);
    assert!(matches!(
        h.generator.tick().await.unwrap(),
        TickOutcome::Generated { height: 3, .. }
    ));
    assert_eq!(h.consensus.current_round(), Some(2));
    assert_eq!(h.consensus.cached_snapshot_rounds(), vec![2]);
    let expected = build_forger_list(
        &compute_snapshot(2, 3, &candidates, &params),
        &seed1,
        &seed2,
        params.number_standby_seats,
    );
    assert_eq!(h.consensus.forger_list(2).unwrap(), expected.as_slice().to_vec());
    assert_eq!(expected.len(), 3);

    // Walk the slots until height 9 is produced, following the new lists.
    let mut tip = h.consensus.executed().last().unwrap().header.clone();
    h.chain.add_header(tip.clone());
    let mut skipped = Vec::new();
    let mut slot = 4;
    while tip.height < 9 {
        assert!(slot < 40, "stuck at height {}", tip.height);
        let now = slot * BLOCK_TIME + 5;
        h.clock.set(now);
        let scheduled = h.consensus.generator_at_timestamp(Timestamp::new(now)).unwrap();
        match h.generator.tick().await.unwrap() {
            TickOutcome::Generated { height, .. } => {
                assert_eq!(scheduled, h.address);
                assert_eq!(height, tip.height + 1);
                tip = h.consensus.executed().last().unwrap().header.clone();
                h.chain.add_header(tip.clone());
            }
            TickOutcome::NotScheduled(address) => {
                assert_eq!(address, scheduled);
                skipped.push(address);
            }
            outcome => panic!("unexpected outcome {outcome:?} at slot {slot}"),
        }
        slot += 1;
    }

    assert!(skipped.iter().all(|a| *a == other || *a == standby));
    assert!(!skipped.is_empty());
    assert_eq!(h.consensus.current_round(), Some(4));
    assert_eq!(h.consensus.cached_snapshot_rounds(), vec![3, 4]);
    assert!(h.consensus.forger_list(4).is_some());
}

#[tokio::test]
async fn failed_commit_still_clears_context() {
    let h = harness(5, 5, true).await;
    h.state_machine.set_fail_commit(true);
    h.clock.set(6 * BLOCK_TIME);

    assert!(h.generator.tick().await.is_err());
    assert_eq!(h.state_machine.clear_count(), 1);
    assert!(h.consensus.executed().is_empty());
    assert!(get_generated_info(h.store.as_ref(), &h.address).unwrap().is_none());
}

#[tokio::test]
async fn invalid_transaction_drops_sender_tail_only() {
    let h = harness(5, 5, true).await;
    let a0 = tx(1, 0, 300);
    let a1 = tx(1, 1, 300);
    let a2 = tx(1, 2, 300);
    let b0 = tx(2, 0, 100);
    for t in [&a0, &a1, &a2, &b0] {
        NullTransactionPool::add(&h.pool, t.clone());
    }
    h.state_machine.script(a1.id().unwrap(), ScriptedOutcome::Invalid);
    h.clock.set(6 * BLOCK_TIME);

    h.generator.tick().await.unwrap();
    let block = h.consensus.executed().remove(0);
    assert_eq!(block.transactions, vec![a0, b0]);
}

#[tokio::test]
async fn disabled_key_stops_generation() {
    let h = harness(5, 5, true).await;
    let endpoint = Endpoint::new(
        h.store.clone(),
        h.keypairs.clone(),
        Arc::new(GeneratorMetrics::new()),
    );
    endpoint
        .update_status(UpdateStatusRequest {
            address: h.address.to_hex(),
            password: String::new(),
            enable: false,
            height: 0,
            max_height_prevoted: 0,
            max_height_generated: 0,
            overwrite: false,
        })
        .await
        .unwrap();
    h.clock.set(6 * BLOCK_TIME);

    assert_eq!(
        h.generator.tick().await.unwrap(),
        TickOutcome::NotScheduled(h.address)
    );
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn init_enables_plain_keys_from_store() {
    let h = harness(5, 5, true).await;
    let fresh = KeypairTable::new();
    let deps = GeneratorDeps {
        consensus: h.consensus.clone(),
        bft: h.bft.clone(),
        state_machine: h.state_machine.clone(),
        chain: h.chain.clone(),
        network: h.network.clone(),
        pool: h.pool.clone(),
        store: h.store.clone(),
        clock: h.clock.clone(),
    };
    let generator = Generator::new(
        GeneratorConfig::default(),
        deps,
        fresh.clone(),
        Arc::new(GeneratorMetrics::new()),
    )
    .unwrap();

    assert_eq!(generator.init().await.unwrap(), 1);
    assert!(fresh.contains(&h.address).await);
    assert_eq!(generator.metrics().keypairs_enabled.get(), 1);
}

#[tokio::test]
async fn init_imports_keys_file_without_enabling_encrypted_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.json");
    let plain = PlainGeneratorKeys::generate().unwrap();
    let address = plain.address();
    let encrypted = encrypt_generator_keys_with(&plain, "pw", CHEAP_KDF).unwrap();
    delos_node::save_keys_file(
        &delos_node::KeysFile {
            keys: vec![delos_node::KeysFileEntry {
                address,
                keys: GeneratorKeys::Encrypted(encrypted),
            }],
        },
        &path,
    )
    .unwrap();

    let h = harness(5, 5, true).await;
    let fresh = KeypairTable::new();
    let config = GeneratorConfig {
        keys_file: Some(path),
        ..GeneratorConfig::default()
    };
    let deps = GeneratorDeps {
        consensus: h.consensus.clone(),
        bft: h.bft.clone(),
        state_machine: h.state_machine.clone(),
        chain: h.chain.clone(),
        network: h.network.clone(),
        pool: h.pool.clone(),
        store: h.store.clone(),
        clock: h.clock.clone(),
    };
    let generator =
        Generator::new(config, deps, fresh.clone(), Arc::new(GeneratorMetrics::new())).unwrap();

    // Only the harness key is plain.
    assert_eq!(generator.init().await.unwrap(), 1);
    assert!(!fresh.contains(&address).await);

    let endpoint = Endpoint::new(h.store.clone(), fresh.clone(), Arc::new(GeneratorMetrics::new()));
    assert!(endpoint.has_keys(&address.to_hex()).await.unwrap());
    let err = endpoint
        .update_status(UpdateStatusRequest {
            address: address.to_hex(),
            password: "nope".into(),
            enable: true,
            height: 0,
            max_height_prevoted: 0,
            max_height_generated: 0,
            overwrite: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EndpointError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn start_loads_pool_from_network_and_stop_is_clean() {
    let h = harness(5, 5, false).await;
    let remote = tx(3, 0, 10);
    h.network.enqueue_network_response(Err("timeout".into()));
    h.network.enqueue_network_response(Ok((
        GetTransactionsResponse {
            transactions: vec![remote.encode().unwrap()],
        }
        .encode()
        .unwrap(),
        "peer-1".into(),
    )));

    let (_tx, rx) = tokio::sync::mpsc::channel(8);
    h.generator.start(rx).await.unwrap();
    assert!(h.generator.is_running().await);
    assert!(NullTransactionPool::contains(&h.pool, &remote.id().unwrap()));
    assert_eq!(h.network.requests().len(), 2);

    let (_tx2, rx2) = tokio::sync::mpsc::channel(8);
    assert!(h.generator.start(rx2).await.is_err());

    h.generator.stop().await;
    assert!(!h.generator.is_running().await);
    assert!(!h.generator.broadcaster().is_running().await);
}

/// Answers like the wrapped network, but only after `delay`.
struct SlowNetwork {
    inner: Arc<NullNetwork>,
    delay: Duration,
}

#[async_trait]
impl Network for SlowNetwork {
    async fn broadcast(&self, event: &str, data: Vec<u8>) -> Result<(), CollaboratorError> {
        <NullNetwork as Network>::broadcast(&self.inner, event, data).await
    }

    async fn request_from_network(
        &self,
        procedure: &str,
        data: Vec<u8>,
    ) -> Result<(Vec<u8>, String), CollaboratorError> {
        tokio::time::sleep(self.delay).await;
        <NullNetwork as Network>::request_from_network(&self.inner, procedure, data).await
    }

    async fn request_from_peer(
        &self,
        procedure: &str,
        data: Vec<u8>,
        peer_id: &str,
    ) -> Result<Vec<u8>, CollaboratorError> {
        <NullNetwork as Network>::request_from_peer(&self.inner, procedure, data, peer_id).await
    }

    async fn apply_penalty_on_peer(
        &self,
        peer_id: &str,
        penalty: u32,
    ) -> Result<(), CollaboratorError> {
        <NullNetwork as Network>::apply_penalty_on_peer(&self.inner, peer_id, penalty).await
    }
}

#[tokio::test]
async fn status_and_stop_do_not_wait_for_the_startup_pull() {
    let h = harness(5, 5, false).await;
    let network = Arc::new(SlowNetwork {
        inner: h.network.clone(),
        delay: Duration::from_millis(200),
    });
    let generator = Arc::new(
        Generator::new(
            GeneratorConfig::default(),
            GeneratorDeps {
                consensus: h.consensus.clone(),
                bft: h.bft.clone(),
                state_machine: h.state_machine.clone(),
                chain: h.chain.clone(),
                network,
                pool: h.pool.clone(),
                store: h.store.clone(),
                clock: h.clock.clone(),
            },
            h.keypairs.clone(),
            Arc::new(GeneratorMetrics::new()),
        )
        .unwrap(),
    );

    let (_tx, rx) = tokio::sync::mpsc::channel(8);
    let starting = tokio::spawn({
        let generator = generator.clone();
        async move { generator.start(rx).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = tokio::time::timeout(Duration::from_millis(100), generator.is_running()).await;
    assert_eq!(status.ok(), Some(false));
    let stopped = tokio::time::timeout(Duration::from_millis(100), generator.stop()).await;
    assert!(stopped.is_ok());

    starting.await.unwrap().unwrap();
    assert!(generator.is_running().await);
    let (_tx2, rx2) = tokio::sync::mpsc::channel(8);
    assert!(generator.start(rx2).await.is_err());
    generator.stop().await;
    assert!(!generator.is_running().await);
}

#[tokio::test]
async fn new_and_deleted_blocks_move_transactions_in_and_out_of_pool() {
    let h = harness(5, 5, true).await;
    NullTransactionPool::add(&h.pool, tx(1, 0, 10));
    h.clock.set(6 * BLOCK_TIME);
    h.generator.tick().await.unwrap();
    let block = h.consensus.executed().remove(0);

    assert_eq!(h.generator.on_new_block(&block).await, 1);
    assert!(NullTransactionPool::is_empty(&h.pool));
    assert_eq!(h.generator.on_delete_block(&block).await, 1);
    assert_eq!(NullTransactionPool::len(&h.pool), 1);
}

// ---------------------------------------------------------------------------
// Gossip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn announced_transactions_reach_the_next_block() {
    let h = harness(5, 5, true).await;
    let remote = tx(9, 0, 50);
    h.network.set_peer_response(
        RPC_GET_TRANSACTIONS,
        GetTransactionsResponse {
            transactions: vec![remote.encode().unwrap()],
        }
        .encode()
        .unwrap(),
    );
    let endpoint = NetworkEndpoint::new(
        h.pool.clone(),
        h.network.clone(),
        h.generator.broadcaster().clone(),
        h.clock.clone(),
        25,
    );
    let announcement = TransactionsAnnouncement {
        transaction_ids: vec![remote.id().unwrap()],
    }
    .encode()
    .unwrap();
    assert_eq!(
        endpoint
            .handle_event_post_transactions_announcement(&announcement, "peer-2")
            .await
            .unwrap(),
        1
    );

    h.clock.set(6 * BLOCK_TIME);
    h.generator.tick().await.unwrap();
    let block = h.consensus.executed().remove(0);
    assert_eq!(block.transactions, vec![remote]);
}

#[tokio::test]
async fn locally_created_transaction_is_pooled_and_announced() {
    let h = harness(5, 5, true).await;
    let local = tx(4, 0, 10);
    let id = h.generator.broadcast_transaction(local).await.unwrap();
    assert!(NullTransactionPool::contains(&h.pool, &id));

    assert_eq!(h.generator.broadcaster().flush().await.unwrap(), 1);
    let broadcasts = h.network.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    let sent = TransactionsAnnouncement::decode(&broadcasts[0].1).unwrap();
    assert_eq!(sent.transaction_ids, vec![id]);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn endpoint_state_survives_lmdb_reopen() {
    use delos_node::SetStatusRequest;
    use delos_store_lmdb::environment::DEFAULT_MAP_SIZE;
    use delos_store_lmdb::LmdbEnvironment;

    let dir = tempfile::tempdir().unwrap();
    let plain = PlainGeneratorKeys::generate().unwrap();
    let address = plain.address();
    {
        let env = LmdbEnvironment::open(dir.path(), 4, DEFAULT_MAP_SIZE).unwrap();
        let endpoint = Endpoint::new(
            Arc::new(env.generator_store()),
            KeypairTable::new(),
            Arc::new(GeneratorMetrics::new()),
        );
        endpoint
            .set_keys(SetKeysRequest {
                address: address.to_hex(),
                keys: GeneratorKeys::Plain(plain),
            })
            .await
            .unwrap();
        endpoint
            .set_status(SetStatusRequest {
                address: address.to_hex(),
                height: 30,
                max_height_prevoted: 28,
                max_height_generated: 25,
            })
            .await
            .unwrap();
    }

    let env = LmdbEnvironment::open(dir.path(), 4, DEFAULT_MAP_SIZE).unwrap();
    let keypairs = KeypairTable::new();
    let endpoint = Endpoint::new(
        Arc::new(env.generator_store()),
        keypairs.clone(),
        Arc::new(GeneratorMetrics::new()),
    );
    let statuses = endpoint.get_status().await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].height, 30);
    assert!(!statuses[0].enabled);

    // Re-enabling without overwrite must echo the stored heights.
    let err = endpoint
        .update_status(UpdateStatusRequest {
            address: address.to_hex(),
            password: String::new(),
            enable: true,
            height: 0,
            max_height_prevoted: 0,
            max_height_generated: 0,
            overwrite: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EndpointError::InvalidBftHeightState(_)));
    endpoint
        .update_status(UpdateStatusRequest {
            address: address.to_hex(),
            password: String::new(),
            enable: true,
            height: 30,
            max_height_prevoted: 28,
            max_height_generated: 25,
            overwrite: false,
        })
        .await
        .unwrap();
    assert!(keypairs.contains(&address).await);
}
