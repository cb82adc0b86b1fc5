use tracing::{debug, warn};

use crate::{
    Identity, Wei,
    error::{LedgerError, TransferError, ValidationError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEvent {
    Deposit { sender: Identity, amount: Wei },
    Withdraw { amount: Wei },
}

/// Outbound value movement, performed by whatever hosts the ledger.
///
/// The ledger lends itself to the transfer, so the recipient may call back into it
/// before the transfer returns. Such calls observe the already decremented balance.
pub trait ValueTransfer {
    fn transfer(
        &mut self,
        ledger: &mut Ledger,
        to: Identity,
        amount: Wei,
    ) -> Result<(), TransferError>;
}

/// Aggregate custody of deposited value. Every withdrawal is paid out to `owner`.
#[derive(Debug)]
pub struct Ledger {
    owner: Identity,
    balance: Wei,
    // payouts whose transfer has not returned yet, still owed back on failure
    in_flight: Wei,
    events: Vec<LedgerEvent>,
}

impl Ledger {
    /// `owner` is the identity constructing the ledger. It cannot be changed later.
    pub fn new(owner: Identity) -> Self {
        Self {
            owner,
            balance: 0,
            in_flight: 0,
            events: Vec::new(),
        }
    }

    pub fn owner(&self) -> Identity {
        self.owner
    }

    pub fn get_balance(&self) -> Wei {
        self.balance
    }

    /// Emitted events, oldest first.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn deposit(&mut self, sender: Identity, amount: Wei) -> Result<(), ValidationError> {
        let event = self.handle_deposit(sender, amount)?;
        self.apply(&event);
        self.events.push(event);
        debug!(sender, amount, balance = self.balance, "deposit accepted");
        Ok(())
    }

    /// Pays `amount` out to the owner. Anyone may trigger it.
    ///
    /// Either the whole withdrawal commits (balance decremented, value moved,
    /// `Withdraw` emitted) or the ledger is left exactly as it was.
    pub fn withdraw<T>(&mut self, amount: Wei, transfer: &mut T) -> Result<(), LedgerError>
    where
        T: ValueTransfer + ?Sized,
    {
        let event = self.handle_withdraw(amount)?;
        // balance must already be reduced when control leaves the ledger
        self.apply(&event);

        let owner = self.owner;
        self.in_flight += amount;
        let transferred = transfer.transfer(self, owner, amount);
        self.in_flight -= amount;
        if let Err(err) = transferred {
            self.revert(&event);
            warn!(owner, amount, %err, "withdrawal rolled back");
            return Err(err.into());
        }

        self.events.push(event);
        debug!(owner, amount, balance = self.balance, "withdrawal committed");
        Ok(())
    }

    fn handle_deposit(
        &self,
        sender: Identity,
        amount: Wei,
    ) -> Result<LedgerEvent, ValidationError> {
        if amount == 0 {
            return Err(ValidationError::ZeroDeposit);
        }
        // room is kept for payouts that may still be rolled back
        if self
            .balance
            .checked_add(self.in_flight)
            .and_then(|reserved| reserved.checked_add(amount))
            .is_none()
        {
            return Err(ValidationError::BalanceOverflow);
        }
        Ok(LedgerEvent::Deposit { sender, amount })
    }

    /// Guards are checked in order: a zero amount is reported before a missing balance.
    fn handle_withdraw(&self, amount: Wei) -> Result<LedgerEvent, ValidationError> {
        if amount == 0 {
            Err(ValidationError::ZeroWithdrawal)
        } else if amount > self.balance {
            Err(ValidationError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            })
        } else {
            Ok(LedgerEvent::Withdraw { amount })
        }
    }

    fn apply(&mut self, event: &LedgerEvent) {
        match *event {
            LedgerEvent::Deposit { amount, .. } => self.balance += amount,
            LedgerEvent::Withdraw { amount } => self.balance -= amount,
        }
    }

    fn revert(&mut self, event: &LedgerEvent) {
        match *event {
            LedgerEvent::Deposit { amount, .. } => self.balance -= amount,
            LedgerEvent::Withdraw { amount } => self.balance += amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Identity = 0;
    const OTHER: Identity = 1;
    const ETHER: Wei = crate::WEI_PER_ETHER;

    #[derive(Default)]
    struct RecordingTransfer {
        reject: bool,
        // (recipient, amount, ledger balance seen during the transfer)
        sent: Vec<(Identity, Wei, Wei)>,
    }

    impl ValueTransfer for RecordingTransfer {
        fn transfer(
            &mut self,
            ledger: &mut Ledger,
            to: Identity,
            amount: Wei,
        ) -> Result<(), TransferError> {
            if self.reject {
                return Err(TransferError::Rejected { to });
            }
            self.sent.push((to, amount, ledger.get_balance()));
            Ok(())
        }
    }

    /// Recipient that tries to withdraw again every time it gets paid.
    #[derive(Default)]
    struct ReenteringOwner {
        received: Wei,
        observed: Vec<Wei>,
        reentry_errors: Vec<LedgerError>,
    }

    impl ValueTransfer for ReenteringOwner {
        fn transfer(
            &mut self,
            ledger: &mut Ledger,
            _to: Identity,
            amount: Wei,
        ) -> Result<(), TransferError> {
            self.observed.push(ledger.get_balance());
            self.received += amount;
            if let Err(err) = ledger.withdraw(amount, self) {
                self.reentry_errors.push(err);
            }
            Ok(())
        }
    }

    /// Withdraws once more from inside the first payout, then refuses that first payout.
    #[derive(Default)]
    struct ReenterThenRefuse {
        calls: u32,
        received: Wei,
    }

    impl ValueTransfer for ReenterThenRefuse {
        fn transfer(
            &mut self,
            ledger: &mut Ledger,
            to: Identity,
            amount: Wei,
        ) -> Result<(), TransferError> {
            self.calls += 1;
            if self.calls > 1 {
                self.received += amount;
                return Ok(());
            }
            let _ = ledger.withdraw(amount, self);
            Err(TransferError::Rejected { to })
        }
    }

    /// Fills the ledger up with a deposit while its payout is pending, then refuses the payout.
    #[derive(Default)]
    struct DepositThenRefuse {
        reentry_result: Option<Result<(), ValidationError>>,
    }

    impl ValueTransfer for DepositThenRefuse {
        fn transfer(
            &mut self,
            ledger: &mut Ledger,
            to: Identity,
            _amount: Wei,
        ) -> Result<(), TransferError> {
            let room = Wei::MAX - ledger.get_balance();
            self.reentry_result = Some(ledger.deposit(OTHER, room));
            Err(TransferError::Rejected { to })
        }
    }

    fn withdraw_events(ledger: &Ledger) -> Vec<Wei> {
        ledger
            .events()
            .iter()
            .filter_map(|evt| match evt {
                LedgerEvent::Withdraw { amount } => Some(*amount),
                LedgerEvent::Deposit { .. } => None,
            })
            .collect()
    }

    #[test]
    fn fresh_ledger() {
        let ledger = Ledger::new(OWNER);
        assert_eq!(ledger.get_balance(), 0);
        assert_eq!(ledger.owner(), OWNER);
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn deposit() {
        let mut ledger = Ledger::new(OWNER);

        let err = ledger.deposit(OWNER, 0).unwrap_err();
        assert_eq!(err, ValidationError::ZeroDeposit);
        assert_eq!(err.to_string(), "Please deposit some money");
        assert_eq!(ledger.get_balance(), 0);
        assert!(ledger.events().is_empty());

        ledger.deposit(OWNER, ETHER).unwrap();
        assert_eq!(ledger.get_balance(), ETHER);
        ledger.deposit(OTHER, 5).unwrap();
        assert_eq!(ledger.get_balance(), ETHER + 5);
        assert_eq!(
            ledger.events(),
            &[
                LedgerEvent::Deposit {
                    sender: OWNER,
                    amount: ETHER
                },
                LedgerEvent::Deposit {
                    sender: OTHER,
                    amount: 5
                },
            ]
        );
    }

    #[test]
    fn deposit_never_wraps() {
        let mut ledger = Ledger::new(OWNER);
        ledger.deposit(OWNER, Wei::MAX).unwrap();
        let err = ledger.deposit(OWNER, 1).unwrap_err();
        assert_eq!(err, ValidationError::BalanceOverflow);
        assert_eq!(ledger.get_balance(), Wei::MAX);
    }

    #[test]
    fn withdraw_guards() {
        let mut ledger = Ledger::new(OWNER);
        let mut transfer = RecordingTransfer::default();

        // zero amount wins over insufficient funds
        let err = ledger.withdraw(0, &mut transfer).unwrap_err();
        assert_eq!(err, LedgerError::Validation(ValidationError::ZeroWithdrawal));
        assert_eq!(
            err.to_string(),
            "Withdrawal amount must be greater than zero"
        );

        ledger.deposit(OWNER, ETHER).unwrap();
        let err = ledger.withdraw(0, &mut transfer).unwrap_err();
        assert_eq!(err, LedgerError::Validation(ValidationError::ZeroWithdrawal));

        let err = ledger.withdraw(ETHER + 1, &mut transfer).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::InsufficientFunds {
                requested,
                available: ETHER,
            }) if requested == ETHER + 1
        ));
        assert_eq!(err.to_string(), "Not enough money");

        assert_eq!(ledger.get_balance(), ETHER);
        assert!(transfer.sent.is_empty());
        assert!(withdraw_events(&ledger).is_empty());
    }

    #[test]
    fn withdraw_pays_owner_after_decrement() {
        let mut ledger = Ledger::new(OWNER);
        let mut transfer = RecordingTransfer::default();
        ledger.deposit(OTHER, ETHER).unwrap();

        ledger.withdraw(1, &mut transfer).unwrap();

        assert_eq!(ledger.get_balance(), ETHER - 1);
        // the transfer already saw the reduced balance
        assert_eq!(transfer.sent, vec![(OWNER, 1, ETHER - 1)]);
        assert_eq!(withdraw_events(&ledger), vec![1]);

        ledger.withdraw(ETHER - 1, &mut transfer).unwrap();
        assert_eq!(ledger.get_balance(), 0);
        assert_eq!(withdraw_events(&ledger), vec![1, ETHER - 1]);
    }

    #[test]
    fn failed_transfer_rolls_back() {
        let mut ledger = Ledger::new(OWNER);
        let mut transfer = RecordingTransfer {
            reject: true,
            ..Default::default()
        };
        ledger.deposit(OWNER, 10).unwrap();
        let events_before = ledger.events().to_vec();

        let err = ledger.withdraw(4, &mut transfer).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Transfer(TransferError::Rejected { to: OWNER })
        );
        assert_eq!(ledger.get_balance(), 10);
        assert_eq!(ledger.events(), events_before.as_slice());

        // recipient accepts again, same withdrawal goes through
        transfer.reject = false;
        ledger.withdraw(4, &mut transfer).unwrap();
        assert_eq!(ledger.get_balance(), 6);
    }

    #[test]
    fn reentry_is_bounded_by_updated_balance() {
        let mut ledger = Ledger::new(OWNER);
        let mut owner = ReenteringOwner::default();
        ledger.deposit(OTHER, 10).unwrap();

        ledger.withdraw(4, &mut owner).unwrap();

        assert_eq!(owner.observed, vec![6, 2]);
        assert_eq!(owner.received, 8);
        assert_eq!(ledger.get_balance(), 2);
        assert_eq!(withdraw_events(&ledger), vec![4, 4]);
        assert!(matches!(
            owner.reentry_errors.as_slice(),
            [LedgerError::Validation(ValidationError::InsufficientFunds {
                requested: 4,
                available: 2
            })]
        ));
    }

    #[test]
    fn nested_withdrawal_survives_outer_failure() {
        let mut ledger = Ledger::new(OWNER);
        let mut owner = ReenterThenRefuse::default();
        ledger.deposit(OTHER, 10).unwrap();

        let err = ledger.withdraw(4, &mut owner).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Transfer(TransferError::Rejected { to: OWNER })
        );

        // only the outer decrement is undone, the nested payout stays committed
        assert_eq!(owner.calls, 2);
        assert_eq!(owner.received, 4);
        assert_eq!(ledger.get_balance(), 6);
        assert_eq!(withdraw_events(&ledger), vec![4]);
    }

    #[test]
    fn pending_payout_keeps_room_for_rollback() {
        let mut ledger = Ledger::new(OWNER);
        let mut owner = DepositThenRefuse::default();
        ledger.deposit(OTHER, 10).unwrap();

        let err = ledger.withdraw(4, &mut owner).unwrap_err();
        assert!(matches!(err, LedgerError::Transfer(_)));
        assert_eq!(
            owner.reentry_result,
            Some(Err(ValidationError::BalanceOverflow))
        );
        assert_eq!(ledger.get_balance(), 10);

        // once nothing is pending the whole range is usable again
        ledger.deposit(OTHER, Wei::MAX - 10).unwrap();
        assert_eq!(ledger.get_balance(), Wei::MAX);
    }

    #[test]
    fn balance_tracks_net_value() {
        let mut ledger = Ledger::new(OWNER);
        let mut transfer = RecordingTransfer::default();
        let mut deposited: Wei = 0;

        for step in 1..=50u32 {
            let amount = Wei::from(step % 7);
            if step % 3 == 0 {
                let _ = ledger.withdraw(amount * 2, &mut transfer);
            } else if ledger.deposit(OTHER, amount).is_ok() {
                deposited += amount;
            }
            let withdrawn: Wei = transfer.sent.iter().map(|(_, amount, _)| amount).sum();
            assert_eq!(ledger.get_balance(), deposited - withdrawn);
            assert_eq!(withdraw_events(&ledger).iter().sum::<Wei>(), withdrawn);
        }
    }
}
