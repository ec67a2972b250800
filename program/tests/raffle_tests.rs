use borsh::BorshDeserialize;
use solana_program::program_pack::Pack;
use solana_program_test::*;
use solana_sdk::{
    account::Account,
    clock::Clock,
    instruction::{AccountMeta, Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
    transaction::{Transaction, TransactionError},
};

use lottery_raffle::{
    coordinator::{
        self, coordinator_address,
        instruction as coordinator_ix,
        state::{CoordinatorState, RequestRecord, Subscription},
        BASE_FEE, GAS_PRICE,
    },
    instruction::{self as raffle_ix, InitializeArgs, RaffleInstruction},
    process_instruction,
    randomness::consumer_address,
    state::{RaffleRound, RoundState},
    upkeep::UpkeepCheck,
};

const ENTRANCE_FEE: u64 = 100;
const INTERVAL: u64 = 30;
const MAX_PARTICIPANTS: u32 = 16;
const SUBSCRIPTION_ID: u64 = 1;

struct Env {
    context: ProgramTestContext,
    program_id: Pubkey,
    coordinator_program: Pubkey,
    raffle: Keypair,
}

// Raffle program plus a funded coordinator subscription with the raffle as consumer
async fn setup() -> Env {
    let program_id = Pubkey::new_unique();
    let coordinator_program = Pubkey::new_unique();

    let mut program_test = ProgramTest::new(
        "lottery_raffle",
        program_id,
        processor!(process_instruction),
    );
    program_test.add_program(
        "vrf_coordinator",
        coordinator_program,
        processor!(coordinator::process_instruction),
    );

    let mut context = program_test.start_with_context().await;
    let payer = context.payer.pubkey();
    let raffle = Keypair::new();
    let (consumer, _) = consumer_address(&program_id, &raffle.pubkey());

    // Coordinator with one funded subscription
    let instructions = vec![
        coordinator_ix::initialize(&coordinator_program, &payer, BASE_FEE, GAS_PRICE).unwrap(),
        coordinator_ix::create_subscription(&coordinator_program, &payer, SUBSCRIPTION_ID).unwrap(),
        coordinator_ix::fund_subscription(
            &coordinator_program,
            &payer,
            SUBSCRIPTION_ID,
            4 * BASE_FEE,
        )
        .unwrap(),
        coordinator_ix::add_consumer(&coordinator_program, &payer, SUBSCRIPTION_ID, &consumer)
            .unwrap(),
    ];
    let mut transaction = Transaction::new_with_payer(&instructions, Some(&payer));
    transaction.sign(&[&context.payer], context.last_blockhash);
    context
        .banks_client
        .process_transaction(transaction)
        .await
        .unwrap();

    // Allocate and initialize the raffle account
    let space = RaffleRound::space(MAX_PARTICIPANTS);
    let rent = context.banks_client.get_rent().await.unwrap();
    let args = InitializeArgs {
        entrance_fee: ENTRANCE_FEE,
        interval: INTERVAL,
        max_participants: MAX_PARTICIPANTS,
        gas_lane: [0u8; 32],
        subscription_id: SUBSCRIPTION_ID,
        request_confirmations: 1,
        callback_gas_limit: 500_000,
        coordinator_program,
    };
    let instructions = vec![
        system_instruction::create_account(
            &payer,
            &raffle.pubkey(),
            rent.minimum_balance(space),
            space as u64,
            &program_id,
        ),
        raffle_ix::initialize_raffle(&program_id, &payer, &raffle.pubkey(), args),
    ];
    let mut transaction = Transaction::new_with_payer(&instructions, Some(&payer));
    transaction.sign(&[&context.payer, &raffle], context.last_blockhash);
    context
        .banks_client
        .process_transaction(transaction)
        .await
        .unwrap();

    Env {
        context,
        program_id,
        coordinator_program,
        raffle,
    }
}

impl Env {
    async fn send(&mut self, instructions: &[Instruction], signers: &[&Keypair]) -> Result<(), TransactionError> {
        let blockhash = self.context.banks_client.get_latest_blockhash().await.unwrap();
        let mut all_signers = vec![&self.context.payer];
        all_signers.extend_from_slice(signers);
        let mut transaction =
            Transaction::new_with_payer(instructions, Some(&self.context.payer.pubkey()));
        transaction.sign(&all_signers, blockhash);
        self.context
            .banks_client
            .process_transaction(transaction)
            .await
            .map_err(|e| e.unwrap())
    }

    // Runs without committing; returns the logs and the raffle's return data
    async fn simulate(&mut self, instructions: &[Instruction], signers: &[&Keypair]) -> (Vec<String>, Option<Vec<u8>>) {
        let blockhash = self.context.banks_client.get_latest_blockhash().await.unwrap();
        let mut all_signers = vec![&self.context.payer];
        all_signers.extend_from_slice(signers);
        let mut transaction =
            Transaction::new_with_payer(instructions, Some(&self.context.payer.pubkey()));
        transaction.sign(&all_signers, blockhash);
        let simulation = self
            .context
            .banks_client
            .simulate_transaction(transaction)
            .await
            .unwrap();
        assert_eq!(simulation.result, Some(Ok(())));
        let details = simulation.simulation_details.unwrap();
        let return_data = details
            .return_data
            .filter(|data| data.program_id == self.program_id)
            .map(|data| data.data);
        (details.logs, return_data)
    }

    async fn check_upkeep(&mut self) -> UpkeepCheck {
        let ix = raffle_ix::check_upkeep(&self.program_id, &self.raffle.pubkey());
        let (_, data) = self.simulate(&[ix], &[]).await;
        UpkeepCheck::try_from_slice(&data.unwrap()).unwrap()
    }

    async fn account(&mut self, address: Pubkey) -> Account {
        self.context
            .banks_client
            .get_account(address)
            .await
            .unwrap()
            .unwrap()
    }

    async fn round(&mut self) -> RaffleRound {
        let account = self.account(self.raffle.pubkey()).await;
        RaffleRound::unpack(&account.data).unwrap()
    }

    async fn lamports(&mut self, address: Pubkey) -> u64 {
        self.account(address).await.lamports
    }

    // System account holding 1 SOL
    async fn funded_player(&mut self) -> Keypair {
        let player = Keypair::new();
        let fund = system_instruction::transfer(
            &self.context.payer.pubkey(),
            &player.pubkey(),
            1_000_000_000,
        );
        self.send(&[fund], &[]).await.unwrap();
        player
    }

    async fn enter(&mut self, player: &Keypair, amount: u64) -> Result<(), TransactionError> {
        let ix = raffle_ix::enter_raffle(&self.program_id, &player.pubkey(), &self.raffle.pubkey(), amount);
        self.send(&[ix], &[player]).await
    }

    async fn advance_clock(&mut self, seconds: i64) {
        let mut clock = self.context.banks_client.get_sysvar::<Clock>().await.unwrap();
        clock.unix_timestamp += seconds;
        self.context.set_sysvar(&clock);
    }

    async fn next_request_id(&mut self) -> u64 {
        let (coordinator, _) = coordinator_address(&self.coordinator_program);
        let account = self.account(coordinator).await;
        CoordinatorState::unpack(&account.data).unwrap().next_request_id
    }

    async fn perform_upkeep(&mut self) -> Result<(), TransactionError> {
        self.perform_upkeep_as(None).await
    }

    // Anyone may trigger upkeep; `caller` also pays for the request account
    async fn perform_upkeep_as(&mut self, caller: Option<&Keypair>) -> Result<(), TransactionError> {
        let request_id = self.next_request_id().await;
        let caller_key = caller
            .map(|c| c.pubkey())
            .unwrap_or_else(|| self.context.payer.pubkey());
        let ix = raffle_ix::perform_upkeep(
            &self.program_id,
            &caller_key,
            &self.raffle.pubkey(),
            &self.coordinator_program,
            SUBSCRIPTION_ID,
            request_id,
        );
        match caller {
            Some(caller) => self.send(&[ix], &[caller]).await,
            None => self.send(&[ix], &[]).await,
        }
    }

    async fn fulfill(
        &mut self,
        request_id: u64,
        winner: Pubkey,
        words: Option<Vec<u64>>,
    ) -> Result<(), TransactionError> {
        let ix = coordinator_ix::fulfill_random_words(
            &self.coordinator_program,
            &self.context.payer.pubkey(),
            SUBSCRIPTION_ID,
            request_id,
            &self.program_id,
            raffle_ix::fulfill_callback_accounts(&self.raffle.pubkey(), &winner),
            words,
        )
        .unwrap();
        self.send(&[ix], &[]).await
    }
}

fn custom(code: u32) -> TransactionError {
    TransactionError::InstructionError(0, InstructionError::Custom(code))
}

// Test initializing the raffle
#[tokio::test]
async fn test_initialize_raffle() {
    let mut env = setup().await;
    let round = env.round().await;

    assert!(round.is_initialized);
    assert_eq!(round.state(), RoundState::Open);
    assert_eq!(round.entrance_fee(), ENTRANCE_FEE);
    assert_eq!(round.interval(), INTERVAL);
    assert_eq!(round.participant_count(), 0);
    assert_eq!(round.recent_winner(), None);
    assert_eq!(round.coordinator(), coordinator_address(&env.coordinator_program).0);
    assert_eq!(round.config.authority, env.context.payer.pubkey());
    assert_eq!(round.config.randomness.num_words, 1);
}

// A second initialize on the same account is rejected
#[tokio::test]
async fn test_initialize_twice_fails() {
    let mut env = setup().await;
    let args = InitializeArgs {
        entrance_fee: ENTRANCE_FEE + 1,
        interval: INTERVAL,
        max_participants: MAX_PARTICIPANTS,
        gas_lane: [0u8; 32],
        subscription_id: SUBSCRIPTION_ID,
        request_confirmations: 1,
        callback_gas_limit: 500_000,
        coordinator_program: env.coordinator_program,
    };
    let ix = raffle_ix::initialize_raffle(
        &env.program_id,
        &env.context.payer.pubkey(),
        &env.raffle.pubkey(),
        args,
    );
    assert_eq!(env.send(&[ix], &[]).await.unwrap_err(), custom(1));
}

// Test entering the raffle
#[tokio::test]
async fn test_enter_raffle() {
    let mut env = setup().await;
    let player = env.funded_player().await;
    let raffle_before = env.lamports(env.raffle.pubkey()).await;

    // Overpaying is accepted and the whole amount lands in the pool
    env.enter(&player, ENTRANCE_FEE + 5).await.unwrap();

    let round = env.round().await;
    assert_eq!(round.participant_count(), 1);
    assert_eq!(round.participant_at(0).unwrap(), player.pubkey());
    assert_eq!(round.pool_balance(), ENTRANCE_FEE + 5);
    assert_eq!(
        env.lamports(env.raffle.pubkey()).await,
        raffle_before + ENTRANCE_FEE + 5
    );
}

#[tokio::test]
async fn test_enter_below_fee_fails() {
    let mut env = setup().await;
    let player = env.funded_player().await;

    assert_eq!(
        env.enter(&player, ENTRANCE_FEE - 1).await.unwrap_err(),
        custom(4)
    );
    assert_eq!(env.round().await.participant_count(), 0);
}

#[tokio::test]
async fn test_upkeep_not_needed() {
    let mut env = setup().await;

    // No players and no time passed
    assert_eq!(env.perform_upkeep().await.unwrap_err(), custom(8));

    // Players but the interval has not elapsed
    let player = env.funded_player().await;
    env.enter(&player, ENTRANCE_FEE).await.unwrap();
    assert_eq!(
        env.perform_upkeep_as(Some(&player)).await.unwrap_err(),
        custom(8)
    );

    let check = raffle_ix::check_upkeep(&env.program_id, &env.raffle.pubkey());
    env.send(&[check], &[]).await.unwrap();
    assert_eq!(env.round().await.state(), RoundState::Open);
}

// Test closing the round and requesting randomness
#[tokio::test]
async fn test_perform_upkeep_closes_round() {
    let mut env = setup().await;
    let player = env.funded_player().await;
    env.enter(&player, ENTRANCE_FEE).await.unwrap();
    env.advance_clock(INTERVAL as i64 + 1).await;

    let request_id = env.next_request_id().await;
    env.perform_upkeep().await.unwrap();

    let round = env.round().await;
    assert_eq!(round.state(), RoundState::Calculating);
    assert_eq!(round.pending_request().unwrap().request_id, request_id);

    // The coordinator recorded the request for the raffle's consumer account
    let (request, _) = coordinator::request_address(&env.coordinator_program, request_id);
    let record = RequestRecord::unpack(&env.account(request).await.data).unwrap();
    assert_eq!(record.consumer, consumer_address(&env.program_id, &env.raffle.pubkey()).0);
    assert_eq!(record.num_words, 1);
    assert!(!record.fulfilled);

    // Entries are closed while calculating
    let late = env.funded_player().await;
    assert_eq!(env.enter(&late, ENTRANCE_FEE).await.unwrap_err(), custom(5));

    // And a second request is refused
    assert_eq!(env.perform_upkeep().await.unwrap_err(), custom(8));
}

#[tokio::test]
async fn test_fulfill_before_request_fails() {
    let mut env = setup().await;
    let player = env.funded_player().await;
    env.enter(&player, ENTRANCE_FEE).await.unwrap();

    // Nonexistent request
    assert_eq!(
        env.fulfill(1, player.pubkey(), None).await.unwrap_err(),
        custom(0x108)
    );
    assert_eq!(
        env.fulfill(0, player.pubkey(), None).await.unwrap_err(),
        custom(0x108)
    );
}

// Only the coordinator account may deliver words
#[tokio::test]
async fn test_direct_fulfill_rejected() {
    let mut env = setup().await;
    let player = env.funded_player().await;
    env.enter(&player, ENTRANCE_FEE).await.unwrap();
    env.advance_clock(INTERVAL as i64 + 1).await;
    let request_id = env.next_request_id().await;
    env.perform_upkeep().await.unwrap();

    let ix = Instruction {
        program_id: env.program_id,
        accounts: vec![
            AccountMeta::new_readonly(env.context.payer.pubkey(), true),
            AccountMeta::new(env.raffle.pubkey(), false),
            AccountMeta::new(player.pubkey(), false),
        ],
        data: RaffleInstruction::FulfillRandomWords {
            request_id,
            random_words: vec![0],
        }
        .pack(),
    };
    assert_eq!(env.send(&[ix], &[]).await.unwrap_err(), custom(12));
    assert_eq!(env.round().await.state(), RoundState::Calculating);
}

// A payout to the wrong account fails and leaves the round calculating
#[tokio::test]
async fn test_fulfill_to_wrong_winner_fails() {
    let mut env = setup().await;
    let first = env.funded_player().await;
    let second = env.funded_player().await;
    env.enter(&first, ENTRANCE_FEE).await.unwrap();
    env.enter(&second, ENTRANCE_FEE).await.unwrap();
    env.advance_clock(INTERVAL as i64 + 1).await;
    let request_id = env.next_request_id().await;
    env.perform_upkeep().await.unwrap();

    // Word 0 picks the first player
    assert_eq!(
        env.fulfill(request_id, second.pubkey(), Some(vec![0]))
            .await
            .unwrap_err(),
        custom(15)
    );

    let round = env.round().await;
    assert_eq!(round.state(), RoundState::Calculating);
    assert_eq!(round.pool_balance(), 2 * ENTRANCE_FEE);
    assert_eq!(round.pending_request().unwrap().request_id, request_id);

    // The request is still open on the coordinator side
    let (request, _) = coordinator::request_address(&env.coordinator_program, request_id);
    let record = RequestRecord::unpack(&env.account(request).await.data).unwrap();
    assert!(!record.fulfilled);

    // Retrying with the drawn winner settles the round
    env.fulfill(request_id, first.pubkey(), Some(vec![2])).await.unwrap();
    let round = env.round().await;
    assert_eq!(round.state(), RoundState::Open);
    assert_eq!(round.recent_winner(), Some(first.pubkey()));
}

// Full round: four entries, word 7 picks index 3 which takes the pool
#[tokio::test]
async fn test_full_round() {
    let mut env = setup().await;
    let mut players = Vec::new();
    for _ in 0..4 {
        let player = env.funded_player().await;
        env.enter(&player, ENTRANCE_FEE).await.unwrap();
        players.push(player);
    }
    let round = env.round().await;
    let started = round.last_timestamp();
    assert_eq!(round.pool_balance(), 4 * ENTRANCE_FEE);

    env.advance_clock(INTERVAL as i64 + 1).await;
    let request_id = env.next_request_id().await;
    env.perform_upkeep().await.unwrap();

    let round = env.round().await;
    let winner = round.select_winner(&[7]).unwrap();
    assert_eq!(winner, players[3].pubkey());

    let winner_before = env.lamports(winner).await;
    let raffle_before = env.lamports(env.raffle.pubkey()).await;
    let (subscription, _) =
        coordinator::subscription_address(&env.coordinator_program, SUBSCRIPTION_ID);
    let balance_before = Subscription::unpack(&env.account(subscription).await.data)
        .unwrap()
        .balance;

    env.fulfill(request_id, winner, Some(vec![7])).await.unwrap();

    assert_eq!(env.lamports(winner).await, winner_before + 4 * ENTRANCE_FEE);
    assert_eq!(
        env.lamports(env.raffle.pubkey()).await,
        raffle_before - 4 * ENTRANCE_FEE
    );

    let round = env.round().await;
    assert_eq!(round.state(), RoundState::Open);
    assert_eq!(round.participant_count(), 0);
    assert_eq!(round.pool_balance(), 0);
    assert_eq!(round.pending_request(), None);
    assert_eq!(round.recent_winner(), Some(winner));
    assert_eq!(round.completed_rounds(), 1);
    assert!(round.last_timestamp() > started);

    // The subscription paid for the fulfillment
    let balance_after = Subscription::unpack(&env.account(subscription).await.data)
        .unwrap()
        .balance;
    assert_eq!(
        balance_before - balance_after,
        coordinator::fulfillment_payment(BASE_FEE, GAS_PRICE, 500_000).unwrap()
    );

    // Replaying the fulfilled request is refused
    assert_eq!(
        env.fulfill(request_id, winner, Some(vec![8])).await.unwrap_err(),
        custom(0x108)
    );

    // The next round accepts entries again
    env.enter(&players[0], ENTRANCE_FEE + 1).await.unwrap();
    assert_eq!(env.round().await.participant_count(), 1);
}

// Without override words the coordinator supplies its own deterministic words
#[tokio::test]
async fn test_fulfill_with_mock_words() {
    let mut env = setup().await;
    let player = env.funded_player().await;
    env.enter(&player, ENTRANCE_FEE).await.unwrap();
    env.advance_clock(INTERVAL as i64 + 1).await;
    let request_id = env.next_request_id().await;
    env.perform_upkeep().await.unwrap();

    let round = env.round().await;
    let words = coordinator::mock_random_words(request_id, 1);
    let winner = round.select_winner(&words).unwrap();
    assert_eq!(winner, player.pubkey());

    env.fulfill(request_id, winner, None).await.unwrap();
    assert_eq!(env.round().await.recent_winner(), Some(player.pubkey()));
}

// CheckUpkeep answers through return data and never changes the round
#[tokio::test]
async fn test_check_upkeep_returns_answer() {
    let mut env = setup().await;

    let check = env.check_upkeep().await;
    assert!(!check.upkeep_needed);
    assert_eq!(check.snapshot.participant_count, 0);
    assert!(check.perform_data.is_empty());

    let player = env.funded_player().await;
    env.enter(&player, ENTRANCE_FEE).await.unwrap();
    let check = env.check_upkeep().await;
    assert!(!check.upkeep_needed);
    assert_eq!(check.snapshot.participant_count, 1);
    assert_eq!(check.snapshot.pool_balance, ENTRANCE_FEE);
    assert_eq!(check.snapshot.state, RoundState::Open);

    env.advance_clock(INTERVAL as i64 + 1).await;
    let check = env.check_upkeep().await;
    assert!(check.upkeep_needed);
    assert!(check.snapshot.elapsed >= INTERVAL);

    env.perform_upkeep().await.unwrap();
    let check = env.check_upkeep().await;
    assert!(!check.upkeep_needed);
    assert_eq!(check.snapshot.state, RoundState::Calculating);
}

// Each step of a round logs its notification
#[tokio::test]
async fn test_events_are_logged() {
    let mut env = setup().await;
    let player = env.funded_player().await;

    let enter = raffle_ix::enter_raffle(&env.program_id, &player.pubkey(), &env.raffle.pubkey(), ENTRANCE_FEE);
    let (logs, _) = env.simulate(&[enter], &[&player]).await;
    let expected = format!("EntryRecorded: participant={}, amount={}", player.pubkey(), ENTRANCE_FEE);
    assert!(logs.iter().any(|line| line.contains(&expected)));
    env.enter(&player, ENTRANCE_FEE).await.unwrap();

    env.advance_clock(INTERVAL as i64 + 1).await;
    let request_id = env.next_request_id().await;
    let perform = raffle_ix::perform_upkeep(
        &env.program_id,
        &env.context.payer.pubkey(),
        &env.raffle.pubkey(),
        &env.coordinator_program,
        SUBSCRIPTION_ID,
        request_id,
    );
    let (logs, _) = env.simulate(&[perform], &[]).await;
    let expected = format!("RequestedRaffleWinner: request_id={}", request_id);
    assert!(logs.iter().any(|line| line.contains(&expected)));
    env.perform_upkeep().await.unwrap();

    let fulfill = coordinator_ix::fulfill_random_words(
        &env.coordinator_program,
        &env.context.payer.pubkey(),
        SUBSCRIPTION_ID,
        request_id,
        &env.program_id,
        raffle_ix::fulfill_callback_accounts(&env.raffle.pubkey(), &player.pubkey()),
        Some(vec![5]),
    )
    .unwrap();
    let (logs, _) = env.simulate(&[fulfill], &[]).await;
    let expected = format!("WinnerPicked: winner={}", player.pubkey());
    assert!(logs.iter().any(|line| line.contains(&expected)));
}
