//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `wallets` - Wallet rows (key: wallet_id)
//! - `transactions` - Immutable transaction records (key: transaction_id)
//! - `indices` - Secondary indices: owner lookup, reference uniqueness
//!   guard, per-wallet commit-ordered listing
//! - `meta` - Commit sequence and per-wallet transaction counts
//!
//! A balance mutation commits the updated wallet row, the transaction
//! record, and every index entry in one [`WriteBatch`], so concurrent
//! readers never observe one without the other.

use crate::{
    error::{Error, Result},
    types::{TransactionRecord, Wallet},
    Config,
};
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_WALLETS: &str = "wallets";
const CF_TRANSACTIONS: &str = "transactions";
const CF_INDICES: &str = "indices";
const CF_META: &str = "meta";

/// Index key tags
const IDX_OWNER: u8 = b'O';
const IDX_REFERENCE: u8 = b'R';
const IDX_WALLET_TXN: u8 = b'T';

/// Meta keys
const META_COMMIT_SEQ: &[u8] = b"commit_seq";
const META_TXN_COUNT: u8 = b'C';

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,

    /// Monotonic commit sequence, restored from `meta` on open
    commit_seq: AtomicU64,

    /// Serializes the reference-uniqueness check with the batch write
    commit_lock: Mutex<()>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_WALLETS, Self::cf_options_wallets()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_transactions()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
            ColumnFamilyDescriptor::new(CF_META, Self::cf_options_meta()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let storage = Self {
            db: Arc::new(db),
            commit_seq: AtomicU64::new(0),
            commit_lock: Mutex::new(()),
        };

        let seq = storage.load_commit_seq()?;
        storage.commit_seq.store(seq, Ordering::SeqCst);

        tracing::info!(path = ?path, commit_seq = seq, "Opened wallet storage");

        Ok(storage)
    }

    // Column family options

    fn cf_options_wallets() -> Options {
        let mut opts = Options::default();
        // Wallet rows are hot, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Point lookups on owner and reference keys benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_options_meta() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Wallet operations

    /// Put wallet row and owner index (atomic)
    ///
    /// Used when provisioning a wallet without a balance mutation.
    pub fn put_wallet(&self, wallet: &Wallet) -> Result<()> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(cf_wallets, wallet.id.as_bytes(), bincode::serialize(wallet)?);
        batch.put_cf(
            cf_indices,
            Self::index_key_owner(wallet.owner_id),
            wallet.id.as_bytes(),
        );
        self.db.write(batch)?;

        tracing::debug!(wallet_id = %wallet.id, owner_id = %wallet.owner_id, "Wallet stored");

        Ok(())
    }

    /// Get wallet by ID
    pub fn get_wallet(&self, wallet_id: Uuid) -> Result<Wallet> {
        let cf = self.cf_handle(CF_WALLETS)?;

        let value = self
            .db
            .get_cf(cf, wallet_id.as_bytes())?
            .ok_or(Error::WalletNotFound(wallet_id))?;

        let wallet: Wallet = bincode::deserialize(&value)?;
        Ok(wallet)
    }

    /// Get wallet by owning user (via index)
    pub fn get_wallet_by_owner(&self, owner_id: Uuid) -> Result<Option<Wallet>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let wallet_id = match self.db.get_cf(cf_indices, Self::index_key_owner(owner_id))? {
            Some(bytes) => {
                let id_bytes: [u8; 16] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::Storage("Corrupt owner index entry".to_string()))?;
                Uuid::from_bytes(id_bytes)
            }
            None => return Ok(None),
        };

        Ok(Some(self.get_wallet(wallet_id)?))
    }

    // Mutation commit

    /// Commit a balance mutation: updated wallet + transaction record +
    /// indices, all-or-nothing.
    ///
    /// Fails with [`Error::DuplicateReference`] before writing anything if
    /// the record's reference has already been issued. Returns the commit
    /// sequence assigned to the record.
    pub fn commit_mutation(&self, wallet: &Wallet, record: &TransactionRecord) -> Result<u64> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_transactions = self.cf_handle(CF_TRANSACTIONS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let cf_meta = self.cf_handle(CF_META)?;

        let ref_key = Self::index_key_reference(&record.reference);

        // The check and the write must not interleave with another commit,
        // otherwise two transactions could claim the same reference.
        let _guard = self.commit_lock.lock();

        if self.db.get_cf(cf_indices, &ref_key)?.is_some() {
            return Err(Error::DuplicateReference(record.reference.clone()));
        }

        let seq = self.commit_seq.load(Ordering::SeqCst) + 1;
        let count = self.wallet_transaction_count(record.wallet_id)? + 1;

        let mut batch = WriteBatch::default();

        // 1. Wallet row + owner index
        batch.put_cf(cf_wallets, wallet.id.as_bytes(), bincode::serialize(wallet)?);
        batch.put_cf(
            cf_indices,
            Self::index_key_owner(wallet.owner_id),
            wallet.id.as_bytes(),
        );

        // 2. Transaction record
        batch.put_cf(
            cf_transactions,
            record.id.as_bytes(),
            bincode::serialize(record)?,
        );

        // 3. Reference uniqueness guard
        batch.put_cf(cf_indices, &ref_key, record.id.as_bytes());

        // 4. Per-wallet listing index (descending sequence => newest first)
        batch.put_cf(
            cf_indices,
            Self::index_key_wallet_txn(record.wallet_id, seq, record.id),
            &[],
        );

        // 5. Commit sequence and per-wallet count
        batch.put_cf(cf_meta, META_COMMIT_SEQ, seq.to_be_bytes());
        batch.put_cf(
            cf_meta,
            Self::meta_key_txn_count(record.wallet_id),
            count.to_be_bytes(),
        );

        self.db.write(batch)?;
        self.commit_seq.store(seq, Ordering::SeqCst);

        tracing::debug!(
            wallet_id = %wallet.id,
            transaction_id = %record.id,
            reference = %record.reference,
            seq,
            "Mutation committed"
        );

        Ok(seq)
    }

    // Transaction operations

    /// Get transaction record by ID
    pub fn get_transaction(&self, transaction_id: Uuid) -> Result<TransactionRecord> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        let value = self
            .db
            .get_cf(cf, transaction_id.as_bytes())?
            .ok_or(Error::TransactionNotFound(transaction_id))?;

        let record: TransactionRecord = bincode::deserialize(&value)?;
        Ok(record)
    }

    /// Get transaction record by reference (via uniqueness guard)
    pub fn get_transaction_by_reference(&self, reference: &str) -> Result<TransactionRecord> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let value = self
            .db
            .get_cf(cf_indices, Self::index_key_reference(reference))?
            .ok_or_else(|| Error::Storage(format!("Unknown reference {}", reference)))?;

        let id_bytes: [u8; 16] = value
            .as_slice()
            .try_into()
            .map_err(|_| Error::Storage("Corrupt reference index entry".to_string()))?;

        self.get_transaction(Uuid::from_bytes(id_bytes))
    }

    /// List a wallet's transactions, newest committed first
    pub fn list_wallet_transactions(
        &self,
        wallet_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TransactionRecord>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let prefix = Self::index_key_wallet_txn_prefix(wallet_id);
        let iter = self.db.prefix_iterator_cf(cf_indices, &prefix);

        let mut records = Vec::new();
        let mut skipped = 0u64;
        for item in iter {
            let (key, _) = item?;

            // prefix_iterator keeps going past the prefix range
            if !key.starts_with(&prefix) {
                break;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            if records.len() as u64 >= limit {
                break;
            }

            // Key layout: tag(1) || wallet_id(16) || rev_seq(8) || txn_id(16)
            if key.len() >= 41 {
                let txn_id_bytes: [u8; 16] = key[25..41]
                    .try_into()
                    .map_err(|_| Error::Storage("Corrupt listing index entry".to_string()))?;
                records.push(self.get_transaction(Uuid::from_bytes(txn_id_bytes))?);
            }
        }

        Ok(records)
    }

    /// Total committed transactions for a wallet
    pub fn wallet_transaction_count(&self, wallet_id: Uuid) -> Result<u64> {
        let cf_meta = self.cf_handle(CF_META)?;

        let count = self
            .db
            .get_cf(cf_meta, Self::meta_key_txn_count(wallet_id))?
            .map(|bytes| Self::decode_u64(&bytes))
            .transpose()?
            .unwrap_or(0);

        Ok(count)
    }

    fn load_commit_seq(&self) -> Result<u64> {
        let cf_meta = self.cf_handle(CF_META)?;

        let seq = self
            .db
            .get_cf(cf_meta, META_COMMIT_SEQ)?
            .map(|bytes| Self::decode_u64(&bytes))
            .transpose()?
            .unwrap_or(0);

        Ok(seq)
    }

    fn decode_u64(bytes: &[u8]) -> Result<u64> {
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Error::Storage("Corrupt u64 meta entry".to_string()))?;
        Ok(u64::from_be_bytes(arr))
    }

    // Index key helpers

    fn index_key_owner(owner_id: Uuid) -> Vec<u8> {
        let mut key = vec![IDX_OWNER];
        key.extend_from_slice(owner_id.as_bytes());
        key
    }

    fn index_key_reference(reference: &str) -> Vec<u8> {
        let mut key = vec![IDX_REFERENCE];
        key.extend_from_slice(reference.as_bytes());
        key
    }

    fn index_key_wallet_txn_prefix(wallet_id: Uuid) -> Vec<u8> {
        let mut key = vec![IDX_WALLET_TXN];
        key.extend_from_slice(wallet_id.as_bytes());
        key
    }

    fn index_key_wallet_txn(wallet_id: Uuid, seq: u64, transaction_id: Uuid) -> Vec<u8> {
        let mut key = Self::index_key_wallet_txn_prefix(wallet_id);
        // Inverted sequence so forward iteration yields newest first
        key.extend_from_slice(&(u64::MAX - seq).to_be_bytes());
        key.extend_from_slice(transaction_id.as_bytes());
        key
    }

    fn meta_key_txn_count(wallet_id: Uuid) -> Vec<u8> {
        let mut key = vec![META_TXN_COUNT];
        key.extend_from_slice(wallet_id.as_bytes());
        key
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_transactions = self.cf_handle(CF_TRANSACTIONS)?;

        Ok(StorageStats {
            total_wallets: self.approximate_count(cf_wallets)?,
            total_transactions: self.approximate_count(cf_transactions)?,
        })
    }

    fn approximate_count(&self, cf: &ColumnFamily) -> Result<u64> {
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Approximate wallet row count
    pub total_wallets: u64,
    /// Approximate transaction record count
    pub total_transactions: u64,
}
