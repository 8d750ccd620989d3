//! Cross-service tests for the loan and escrow ledgers live in `tests/`.
