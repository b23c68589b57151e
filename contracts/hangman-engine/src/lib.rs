//! Hangman Commit-Reveal Engine Contract
//!
//! A two-party Hangman game in which a referee commits to a secret word before
//! play starts, answers the player's letter guesses during play, and must
//! reveal the word afterward. The contract never learns the word until
//! `reveal`; it only adjudicates whether the referee's answers were honest
//! once the word is disclosed.
//!
//! ## Game Flow
//! 1. Player calls `start` with a chosen word length; the game enters
//!    `WaitingCommit`.
//! 2. The configured referee calls `commit` with `SHA256(player ‖ salt ‖
//!    word)` and posts `required_bond` of the configured bond token.
//! 3. The player guesses letters off-chain; the referee answers each one
//!    on-chain via `answer`, supplying a positions bitmask. Six wrong answers
//!    end the game in `Lost`; a fully-revealed word ends it in `Won`.
//! 4. The referee calls `reveal` with the plaintext word and salt. The
//!    contract recomputes the commitment and replays every recorded answer
//!    against the word; any mismatch routes the bond to the player instead
//!    of the referee.
//! 5. If the referee never reveals, the player may call `claim_forfeit` once
//!    the reveal deadline has passed.
//!
//! ## Consistency Check
//! Every `answer` is checked against the visible mask before it is accepted,
//! so contradictions are rejected the moment they happen rather than only at
//! reveal time. The reveal-time check instead verifies that the *word itself*
//! agrees with every answer the referee already committed to: wrong letters
//! must be genuinely absent, and correct letters must occupy exactly the
//! positions the referee claimed.
//!
//! ## Storage Strategy
//! - `instance()` storage: contract-level config (Referee, BondToken,
//!   RequiredBond). Small, bounded, stored in a single ledger entry.
//! - `persistent()` storage: one `Game` record per player, each an
//!   independent ledger entry with its own TTL extended on every write.
//!
//! ## Security
//! - Only the configured referee may commit, answer, or reveal.
//! - Only the player may start their own game or claim a forfeit.
//! - The bond is held by the contract's own address between `commit` and
//!   settlement; `reveal`/`claim_forfeit` transfer it out atomically with the
//!   state transition that ends the game, so a failed transfer rolls back
//!   the whole invocation instead of leaving a stuck bond.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, token, xdr::ToXdr,
    Address, Bytes, BytesN, Env, Vec,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum secret word length.
pub const MIN_LEN: u32 = 4;
/// Maximum secret word length.
pub const MAX_LEN: u32 = 10;
/// Number of wrong guesses that end a game in `Lost`.
pub const MAX_WRONG: u32 = 6;
/// Seconds after a game ends before an unrevealed bond can be claimed.
pub const REVEAL_DEADLINE: u64 = 1_800;
/// Extend a game's TTL to this many ledgers (~30 days at 5 s/ledger) on write.
pub const GAME_TTL_LEDGERS: u32 = 518_400;
/// Only pay for an extension once the TTL has decayed past half its target —
/// avoids re-bumping on every single write to an already-fresh record.
pub const GAME_TTL_THRESHOLD_LEDGERS: u32 = GAME_TTL_LEDGERS / 2;

/// Size of the Latin alphabet the engine bitsets are indexed over.
const ALPHABET_LEN: u32 = 26;
/// Sentinel byte for an unrevealed visible-mask cell.
const HOLE: u8 = 0;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    NotReferee = 3,
    BadState = 4,
    BadBond = 5,
    InvalidLetter = 6,
    MaskOutOfRange = 7,
    AlreadyGuessed = 8,
    ContradictsRevealed = 9,
    LengthMismatch = 10,
    CommitMismatch = 11,
    WrongLetterPresent = 12,
    PositionsMismatch = 13,
    MaskMismatch = 14,
    DeadlineNotPassed = 15,
    NoBond = 16,
    Overflow = 17,
}

// ---------------------------------------------------------------------------
// Storage types
// ---------------------------------------------------------------------------

/// Lifecycle state of a single player's game.
#[contracttype]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameStatus {
    /// No game on record (or the previous one was fully settled and reset).
    None = 0,
    /// `start` was called; waiting on the referee's `commit`.
    WaitingCommit = 1,
    /// Commit received; accepting `answer` calls.
    Active = 2,
    /// The visible mask has no holes left.
    Won = 3,
    /// `wrong_guesses` reached `MAX_WRONG`.
    Lost = 4,
    /// Bond routed to the player due to referee dishonesty or timeout.
    Forfeit = 5,
}

/// Per-player game record. The sole unit of mutable state in this contract.
#[contracttype]
#[derive(Clone)]
pub struct Game {
    pub status: GameStatus,
    /// Word length fixed at `start`; bounds every positions mask below it.
    pub length: u32,
    pub wrong_guesses: u32,
    /// One byte per position: `HOLE` or the revealed lowercase letter.
    pub visible_mask: Bytes,
    /// Bit `i` set iff letter `i` (`'a'..='z'` as `0..26`) has been answered.
    pub guessed_mask: u32,
    /// Bit `i` set iff letter `i` was confirmed present.
    pub correct_mask: u32,
    /// Bit `i` set iff letter `i` was confirmed absent.
    pub wrong_mask: u32,
    /// 26-entry table of positions masks, nonzero only for `correct_mask` letters.
    pub positions_by_letter: Vec<u32>,
    /// `SHA256(player ‖ salt ‖ word)`, all-zero until `commit`.
    pub commitment: BytesN<32>,
    /// Bond held by the contract for this game; zero once routed.
    pub bond: i128,
    /// Ledger timestamp after which `claim_forfeit` is allowed; zero until armed.
    pub reveal_deadline: u64,
    pub revealed: bool,
}

/// Storage key discriminants.
///
/// `Referee`, `BondToken`, and `RequiredBond` are instance-level config set
/// once at `init`. `Game(player)` is a persistent, per-player ledger entry.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Referee,
    BondToken,
    RequiredBond,
    Game(Address),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct GameStarted {
    #[topic]
    pub player: Address,
    pub length: u32,
    pub hole_mask: Bytes,
}

#[contractevent]
pub struct WordCommitted {
    #[topic]
    pub player: Address,
    pub hash: BytesN<32>,
    pub bond: i128,
}

#[contractevent]
pub struct RefereeAnswered {
    #[topic]
    pub player: Address,
    /// The normalized lowercase letter byte (e.g. `b'e'`).
    pub letter: u32,
    pub positions_mask: u32,
    pub correct: bool,
}

#[contractevent]
pub struct GameEnded {
    #[topic]
    pub player: Address,
    pub status: GameStatus,
}

#[contractevent]
pub struct WordRevealed {
    #[topic]
    pub player: Address,
    pub word: Bytes,
    pub salt: BytesN<32>,
}

#[contractevent]
pub struct RefereeSlashed {
    #[topic]
    pub player: Address,
    pub amount: i128,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct HangmanEngine;

#[contractimpl]
impl HangmanEngine {
    // -----------------------------------------------------------------------
    // init
    // -----------------------------------------------------------------------

    /// Initialize the contract. May only be called once; the caller must be
    /// the `referee` address being registered, so nobody else can front-run
    /// deployment and self-assign as referee.
    ///
    /// `referee` is the single address permitted to call `commit`, `answer`,
    /// and `reveal` for every game this contract ever hosts. `bond_token` is
    /// the Stellar Asset Contract the bond is denominated in; `required_bond`
    /// is the fixed stake every `commit` must post.
    pub fn init(
        env: Env,
        referee: Address,
        bond_token: Address,
        required_bond: i128,
    ) -> Result<(), Error> {
        referee.require_auth();

        if env.storage().instance().has(&DataKey::Referee) {
            return Err(Error::AlreadyInitialized);
        }

        env.storage().instance().set(&DataKey::Referee, &referee);
        env.storage()
            .instance()
            .set(&DataKey::BondToken, &bond_token);
        env.storage()
            .instance()
            .set(&DataKey::RequiredBond, &required_bond);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // start
    // -----------------------------------------------------------------------

    /// Start (or restart) a game for `player` with the given word `length`.
    ///
    /// Allowed from `None`, `Won`, `Lost`, or `Forfeit`; rejected while a game
    /// is `WaitingCommit` or `Active`. Resets every bitset, zeroes the
    /// commitment and bond, and arms a fresh all-hole visible mask.
    ///
    /// Emits `GameStarted`.
    pub fn start(env: Env, player: Address, length: u32) -> Result<(), Error> {
        player.require_auth();

        if length < MIN_LEN || length > MAX_LEN {
            return Err(Error::MaskOutOfRange);
        }

        let key = DataKey::Game(player.clone());
        if let Some(existing) = get_game_opt(&env, &key) {
            if matches!(existing.status, GameStatus::WaitingCommit | GameStatus::Active) {
                return Err(Error::BadState);
            }
        }

        let mut hole_mask = Bytes::new(&env);
        for _ in 0..length {
            hole_mask.push_back(HOLE);
        }

        let game = Game {
            status: GameStatus::WaitingCommit,
            length,
            wrong_guesses: 0,
            visible_mask: hole_mask.clone(),
            guessed_mask: 0,
            correct_mask: 0,
            wrong_mask: 0,
            positions_by_letter: zero_positions(&env),
            commitment: zero_hash(&env),
            bond: 0,
            reveal_deadline: 0,
            revealed: false,
        };

        persist_set(&env, key, &game);

        GameStarted {
            player,
            length,
            hole_mask,
        }
        .publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // commit
    // -----------------------------------------------------------------------

    /// Commit to a word hash and post the required bond. Referee only.
    ///
    /// Transfers `bond_amount` of the configured bond token from `referee`
    /// to the contract's own address before recording the commitment, so a
    /// failed transfer leaves the game untouched in `WaitingCommit`.
    ///
    /// Emits `WordCommitted`.
    pub fn commit(
        env: Env,
        referee: Address,
        player: Address,
        hash: BytesN<32>,
        bond_amount: i128,
    ) -> Result<(), Error> {
        require_referee(&env, &referee)?;
        referee.require_auth();

        let key = DataKey::Game(player.clone());
        let mut game = get_game_opt(&env, &key).ok_or(Error::BadState)?;

        if game.status != GameStatus::WaitingCommit {
            return Err(Error::BadState);
        }
        if game.commitment != zero_hash(&env) {
            return Err(Error::BadState);
        }

        let required_bond = get_required_bond(&env)?;
        if bond_amount != required_bond {
            return Err(Error::BadBond);
        }

        let bond_token = get_bond_token(&env)?;
        token::Client::new(&env, &bond_token).transfer(
            &referee,
            &env.current_contract_address(),
            &bond_amount,
        );

        game.commitment = hash.clone();
        game.bond = bond_amount;
        game.status = GameStatus::Active;
        persist_set(&env, key, &game);

        WordCommitted {
            player,
            hash,
            bond: bond_amount,
        }
        .publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // answer
    // -----------------------------------------------------------------------

    /// Answer a single letter guess. Referee only.
    ///
    /// A zero `positions_mask` means the letter is absent (wrong); a nonzero
    /// mask means it occurs at every set bit position (correct). A correct
    /// answer is checked against the current visible mask before acceptance:
    /// it must neither contradict a position already revealed as a different
    /// letter nor omit a position already revealed as this letter.
    ///
    /// Emits `RefereeAnswered`, plus `GameEnded` if this answer ends the game.
    pub fn answer(
        env: Env,
        referee: Address,
        player: Address,
        letter: u32,
        positions_mask: u32,
    ) -> Result<(), Error> {
        require_referee(&env, &referee)?;
        referee.require_auth();

        let key = DataKey::Game(player.clone());
        let mut game = get_game_opt(&env, &key).ok_or(Error::BadState)?;

        if game.status != GameStatus::Active {
            return Err(Error::BadState);
        }

        let letter_index = normalize(letter)?;
        let bit = 1u32 << letter_index;

        if game.guessed_mask & bit != 0 {
            return Err(Error::AlreadyGuessed);
        }
        if !mask_fits(positions_mask, game.length) {
            return Err(Error::MaskOutOfRange);
        }

        let correct = positions_mask != 0;
        let letter_byte = b'a' + letter_index as u8;

        if correct {
            for i in 0..game.length {
                let revealed = game.visible_mask.get(i).unwrap_or(HOLE);
                let bit_set = (positions_mask >> i) & 1 == 1;
                if revealed != HOLE {
                    let should_be_set = revealed == letter_byte;
                    if should_be_set != bit_set {
                        return Err(Error::ContradictsRevealed);
                    }
                }
            }
        }

        game.guessed_mask |= bit;

        if correct {
            game.correct_mask |= bit;
            game.positions_by_letter.set(letter_index, positions_mask);
            for i in 0..game.length {
                if (positions_mask >> i) & 1 == 1 {
                    game.visible_mask.set(i, letter_byte);
                }
            }
        } else {
            game.wrong_mask |= bit;
            game.wrong_guesses = game.wrong_guesses.checked_add(1).ok_or(Error::Overflow)?;
        }

        let mut ended: Option<GameStatus> = None;
        if !correct && game.wrong_guesses == MAX_WRONG {
            game.status = GameStatus::Lost;
            game.reveal_deadline = reveal_deadline_at(&env)?;
            ended = Some(GameStatus::Lost);
        } else if correct && no_holes(&game.visible_mask, game.length) {
            game.status = GameStatus::Won;
            game.reveal_deadline = reveal_deadline_at(&env)?;
            ended = Some(GameStatus::Won);
        }

        persist_set(&env, key, &game);

        RefereeAnswered {
            player: player.clone(),
            letter: letter_byte as u32,
            positions_mask,
            correct,
        }
        .publish(&env);

        if let Some(status) = ended {
            GameEnded { player, status }.publish(&env);
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // reveal
    // -----------------------------------------------------------------------

    /// Reveal the word and salt, settling the game. Referee only.
    ///
    /// Recomputes the commitment and, if it matches, replays every recorded
    /// answer against the word: a letter marked wrong must be truly absent,
    /// and a letter marked correct must occupy exactly its recorded
    /// positions. Any mismatch routes the bond to the player and ends the
    /// game in `Forfeit` instead of paying the referee.
    ///
    /// Emits `WordRevealed` on success, or `RefereeSlashed` + `GameEnded` on
    /// a dishonesty finding.
    pub fn reveal(
        env: Env,
        referee: Address,
        player: Address,
        word: Bytes,
        salt: BytesN<32>,
    ) -> Result<(), Error> {
        require_referee(&env, &referee)?;
        referee.require_auth();

        let key = DataKey::Game(player.clone());
        let mut game = get_game_opt(&env, &key).ok_or(Error::BadState)?;

        if !matches!(game.status, GameStatus::Won | GameStatus::Lost) || game.revealed {
            return Err(Error::BadState);
        }

        if word.len() != game.length {
            return Err(Error::LengthMismatch);
        }

        let digest = commit_digest(&env, &player, &salt, &word);
        if digest != game.commitment {
            slash(&env, &mut game, key, &player)?;
            return Err(Error::CommitMismatch);
        }

        let expected = expected_positions(&env, &word);

        for letter_index in 0..ALPHABET_LEN {
            let bit = 1u32 << letter_index;
            let exp = expected.get(letter_index).unwrap_or(0);

            if game.wrong_mask & bit != 0 && exp != 0 {
                slash(&env, &mut game, key, &player)?;
                return Err(Error::WrongLetterPresent);
            }
            if game.correct_mask & bit != 0 {
                let stored = game.positions_by_letter.get(letter_index).unwrap_or(0);
                if exp != stored {
                    slash(&env, &mut game, key, &player)?;
                    return Err(Error::PositionsMismatch);
                }
            }
        }

        for i in 0..game.length {
            let revealed = game.visible_mask.get(i).unwrap_or(HOLE);
            if revealed != HOLE && word.get(i).unwrap_or(HOLE) != revealed {
                slash(&env, &mut game, key, &player)?;
                return Err(Error::MaskMismatch);
            }
        }

        let bond_token = get_bond_token(&env)?;
        token::Client::new(&env, &bond_token).transfer(
            &env.current_contract_address(),
            &referee,
            &game.bond,
        );

        game.revealed = true;
        game.bond = 0;
        persist_set(&env, key, &game);

        WordRevealed { player, word, salt }.publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // claim_forfeit
    // -----------------------------------------------------------------------

    /// Claim the bond after the referee missed the reveal deadline. Player only.
    ///
    /// Emits `RefereeSlashed` and `GameEnded(Forfeit)`.
    pub fn claim_forfeit(env: Env, player: Address) -> Result<(), Error> {
        player.require_auth();

        let key = DataKey::Game(player.clone());
        let mut game = get_game_opt(&env, &key).ok_or(Error::BadState)?;

        if !matches!(game.status, GameStatus::Won | GameStatus::Lost) || game.revealed {
            return Err(Error::BadState);
        }
        if game.reveal_deadline == 0 || env.ledger().timestamp() <= game.reveal_deadline {
            return Err(Error::DeadlineNotPassed);
        }
        if game.bond == 0 {
            return Err(Error::NoBond);
        }

        let amount = game.bond;
        let bond_token = get_bond_token(&env)?;
        token::Client::new(&env, &bond_token).transfer(
            &env.current_contract_address(),
            &player,
            &amount,
        );

        game.bond = 0;
        game.status = GameStatus::Forfeit;
        game.revealed = true;
        persist_set(&env, key, &game);

        RefereeSlashed {
            player: player.clone(),
            amount,
        }
        .publish(&env);
        GameEnded {
            player,
            status: GameStatus::Forfeit,
        }
        .publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // observe
    // -----------------------------------------------------------------------

    /// Returns a player's game snapshot, or a zeroed `None`-status record if
    /// they have never called `start`.
    pub fn observe(env: Env, player: Address) -> Game {
        get_game_opt(&env, &DataKey::Game(player)).unwrap_or_else(|| zero_game(&env))
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Slash the referee's bond to the player and end the game in `Forfeit`.
///
/// Called from `reveal` the moment any honesty check fails; the caller is
/// still responsible for returning the matching `Error` afterward.
fn slash(env: &Env, game: &mut Game, key: DataKey, player: &Address) -> Result<(), Error> {
    let amount = game.bond;
    let bond_token = get_bond_token(env)?;
    token::Client::new(env, &bond_token).transfer(
        &env.current_contract_address(),
        player,
        &amount,
    );

    game.bond = 0;
    game.status = GameStatus::Forfeit;
    game.revealed = true;
    persist_set(env, key, game);

    RefereeSlashed {
        player: player.clone(),
        amount,
    }
    .publish(env);
    GameEnded {
        player: player.clone(),
        status: GameStatus::Forfeit,
    }
    .publish(env);

    Ok(())
}

/// Maps an ASCII letter byte (either case) to its `0..26` alphabet index.
fn normalize(byte: u32) -> Result<u32, Error> {
    if (b'a' as u32..=b'z' as u32).contains(&byte) {
        Ok(byte - b'a' as u32)
    } else if (b'A' as u32..=b'Z' as u32).contains(&byte) {
        Ok(byte - b'A' as u32)
    } else {
        Err(Error::InvalidLetter)
    }
}

/// True iff `mask` has no bit set at or above position `length`.
fn mask_fits(mask: u32, length: u32) -> bool {
    length < 32 && mask < (1u32 << length)
}

/// Ledger timestamp after which `claim_forfeit` becomes callable, armed the
/// moment a game reaches `Won` or `Lost`.
fn reveal_deadline_at(env: &Env) -> Result<u64, Error> {
    env.ledger()
        .timestamp()
        .checked_add(REVEAL_DEADLINE)
        .ok_or(Error::Overflow)
}

/// Canonical commitment digest: `SHA256(player ‖ salt ‖ word)`, no length
/// prefixes or separators. The player's address is encoded via its XDR
/// representation so the digest binds a specific game instance, not just a
/// (salt, word) pair that could otherwise be replayed across players.
fn commit_digest(env: &Env, player: &Address, salt: &BytesN<32>, word: &Bytes) -> BytesN<32> {
    let mut buf = player.to_xdr(env);
    buf.append(&Bytes::from(salt.clone()));
    buf.append(word);
    env.crypto().sha256(&buf).into()
}

/// Re-derives, for every letter, the positions bitmask it actually occupies
/// in `word` — the same shape as `Game::positions_by_letter`, used to check
/// every recorded answer against the revealed word in one pass.
fn expected_positions(env: &Env, word: &Bytes) -> Vec<u32> {
    let mut expected = zero_positions(env);
    for i in 0..word.len() {
        let byte = word.get(i).unwrap_or(HOLE);
        if let Ok(idx) = normalize(byte as u32) {
            let bit = expected.get(idx).unwrap_or(0);
            expected.set(idx, bit | (1 << i));
        }
    }
    expected
}

/// True iff every one of the first `length` cells of `mask` is non-hole.
fn no_holes(mask: &Bytes, length: u32) -> bool {
    for i in 0..length {
        if mask.get(i).unwrap_or(HOLE) == HOLE {
            return false;
        }
    }
    true
}

fn zero_positions(env: &Env) -> Vec<u32> {
    let mut v = Vec::new(env);
    for _ in 0..ALPHABET_LEN {
        v.push_back(0);
    }
    v
}

fn zero_hash(env: &Env) -> BytesN<32> {
    BytesN::from_array(env, &[0u8; 32])
}

fn zero_game(env: &Env) -> Game {
    Game {
        status: GameStatus::None,
        length: 0,
        wrong_guesses: 0,
        visible_mask: Bytes::new(env),
        guessed_mask: 0,
        correct_mask: 0,
        wrong_mask: 0,
        positions_by_letter: zero_positions(env),
        commitment: zero_hash(env),
        bond: 0,
        reveal_deadline: 0,
        revealed: false,
    }
}

fn get_game_opt(env: &Env, key: &DataKey) -> Option<Game> {
    env.storage().persistent().get(key)
}

fn require_referee(env: &Env, referee: &Address) -> Result<(), Error> {
    let configured = get_referee(env)?;
    if &configured != referee {
        return Err(Error::NotReferee);
    }
    Ok(())
}

fn get_referee(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Referee)
        .ok_or(Error::NotInitialized)
}

fn get_bond_token(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::BondToken)
        .ok_or(Error::NotInitialized)
}

fn get_required_bond(env: &Env) -> Result<i128, Error> {
    env.storage()
        .instance()
        .get(&DataKey::RequiredBond)
        .ok_or(Error::NotInitialized)
}

/// Persist a value in persistent storage and extend its TTL, only actually
/// bumping once the entry has decayed below `GAME_TTL_THRESHOLD_LEDGERS`.
fn persist_set<V: soroban_sdk::IntoVal<Env, soroban_sdk::Val>>(env: &Env, key: DataKey, val: &V) {
    env.storage().persistent().set(&key, val);
    env.storage().persistent().extend_ttl(
        &key,
        GAME_TTL_THRESHOLD_LEDGERS,
        GAME_TTL_LEDGERS,
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
